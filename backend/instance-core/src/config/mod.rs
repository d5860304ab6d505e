//! Single-instance configuration, stored as `instance.json` next to the
//! application's other settings.

use crate::error::config::ConfigError;
use crate::{APP_IDENTIFIER, DEFAULT_INSTANCE_PORT};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "instance.json";
const CONFIG_VERSION: u32 = 1;
const MAX_IDENTIFIER_LEN: usize = 64;

// ============================================
// ENUMS WITH DEFAULTS
// ============================================

/// Which family of rendezvous primitive to use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TransportStrategy {
    /// Named pipe on Windows, filesystem socket everywhere else.
    #[default]
    Native,
    /// Fixed TCP port on `127.0.0.1`.
    Loopback,
}

/// What the listener does after an accept/read/dispatch failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ListenerFaultPolicy {
    /// The first fault ends the listener for the rest of the process lifetime.
    #[default]
    StopOnFault,
    /// Log the fault and keep accepting connections.
    Resilient,
}

// ============================================
// CONFIG STRUCT
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_app_identifier")]
    pub app_identifier: String,

    #[serde(default)]
    pub transport: TransportStrategy,

    #[serde(default = "default_loopback_port")]
    pub loopback_port: u16,

    /// Directory for the socket file. `None` means the system temp directory.
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,

    #[serde(default = "default_notify_timeout_ms")]
    pub notify_timeout_ms: u64,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    #[serde(default)]
    pub fault_policy: ListenerFaultPolicy,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_identifier: default_app_identifier(),
            transport: TransportStrategy::default(),
            loopback_port: default_loopback_port(),
            socket_dir: None,
            notify_timeout_ms: default_notify_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            fault_policy: ListenerFaultPolicy::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_app_identifier() -> String {
    APP_IDENTIFIER.to_string()
}
fn default_loopback_port() -> u16 {
    DEFAULT_INSTANCE_PORT
}
fn default_notify_timeout_ms() -> u64 {
    200
}
fn default_shutdown_timeout_ms() -> u64 {
    500
}

// ============================================
// IMPLEMENTATION
// ============================================

impl InstanceConfig {
    /// Load config from {config_dir}/instance.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(InstanceConfig)` if loaded successfully or defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is corrupted/invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Instance config not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read instance config: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: InstanceConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse instance config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Instance config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/instance.json using temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Instance config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        // The identifier becomes a file name and a pipe name.
        if self.app_identifier.is_empty() || self.app_identifier.len() > MAX_IDENTIFIER_LEN {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid app identifier length: {} (must be 1-{})",
                    self.app_identifier.len(),
                    MAX_IDENTIFIER_LEN
                ),
            });
        }

        if let Some(bad) = self
            .app_identifier
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid character {bad:?} in app identifier {:?}",
                    self.app_identifier
                ),
            });
        }

        if self.loopback_port == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "loopback_port cannot be 0".to_string(),
            });
        }

        if self.notify_timeout_ms == 0 || self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Timeouts must be positive (notify={}ms, shutdown={}ms)",
                    self.notify_timeout_ms, self.shutdown_timeout_ms
                ),
            });
        }

        Ok(())
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
