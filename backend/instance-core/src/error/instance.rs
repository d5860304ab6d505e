use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors raised inside the single-instance subsystem.
///
/// None of these reach the end user. Bind failures become the secondary role,
/// notifier failures are swallowed and listener failures end the listener task.
#[derive(Debug, ThisError)]
pub enum InstanceError {
    #[error("Bind Error: {message} {location}")]
    Bind {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        kind: ErrorKind,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    #[error("Dispatch Error: {message} {location}")]
    Dispatch {
        message: String,
        location: ErrorLocation,
    },

    #[error("Join Error: {message} {location}")]
    Join {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for InstanceError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        InstanceError::Io {
            message: error.to_string(),
            kind: error.kind(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<tokio::task::JoinError> for InstanceError {
    #[track_caller]
    fn from(error: tokio::task::JoinError) -> Self {
        InstanceError::Join {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
