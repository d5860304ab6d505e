pub mod config;
pub mod instance;

pub use config::ConfigError;
pub use instance::InstanceError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Instance(#[from] instance::InstanceError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
