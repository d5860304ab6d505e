use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the application shell.
///
/// None of these reach the user; they end up in the log before the process exits.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OverseerError {
    /// Error from this App
    #[error("Overseer Error: {message} {location}")]
    Overseer {
        message: String,
        location: ErrorLocation,
    },

    /// Error from instance-core (config, bind, listener)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// A platform directory (config or log) could not be determined
    #[error("Directory Error: {message} {location}")]
    Directory {
        message: String,
        location: ErrorLocation,
    },

    /// The async runtime could not be built
    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },
}

impl From<instance_core::error::CoreError> for OverseerError {
    #[track_caller]
    fn from(error: instance_core::error::CoreError) -> Self {
        OverseerError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}
