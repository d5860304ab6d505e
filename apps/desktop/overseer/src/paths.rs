//! Platform directories for config and logs.

use crate::error::OverseerError;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// Directory name under the platform config/data roots.
pub const APP_DIR_NAME: &str = "overseer";

const LOG_DIR_NAME: &str = "logs";

/// `<config_dir>/overseer`, e.g. `~/.config/overseer` on Linux.
pub fn config_dir() -> Result<PathBuf, OverseerError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| OverseerError::Directory {
            message: "Platform config directory is unknown".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// `<data_local_dir>/overseer/logs`.
pub fn log_dir() -> Result<PathBuf, OverseerError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(LOG_DIR_NAME))
        .ok_or_else(|| OverseerError::Directory {
            message: "Platform data directory is unknown".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
}

/// Create `dir` and its parents.
#[track_caller]
pub fn ensure_dir(dir: &Path) -> Result<(), OverseerError> {
    create_dir_all(dir).map_err(|e| OverseerError::Directory {
        message: format!("Failed to create {}: {e}", dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })
}
