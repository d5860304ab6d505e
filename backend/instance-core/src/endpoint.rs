//! Rendezvous endpoint resolution.
//!
//! Every launch derives the same endpoint from the configured application
//! identifier, so primary and secondary agree on where to meet without any
//! prior coordination.

use crate::PIPE_NAMESPACE;
use crate::config::{InstanceConfig, TransportStrategy};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::path::PathBuf;

/// Where the primary listens and secondaries connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendezvousEndpoint {
    /// Full pipe path, e.g. `\\.\pipe\remnant_overseer_ipc`.
    NamedPipe(String),
    /// Unix domain socket file.
    SocketPath(PathBuf),
    /// TCP port on `127.0.0.1`.
    Loopback(u16),
}

impl RendezvousEndpoint {
    /// Path of the filesystem artifact owned by the primary, if this transport has one.
    pub fn artifact_path(&self) -> Option<&PathBuf> {
        match self {
            RendezvousEndpoint::SocketPath(path) => Some(path),
            RendezvousEndpoint::NamedPipe(_) | RendezvousEndpoint::Loopback(_) => None,
        }
    }
}

impl Display for RendezvousEndpoint {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            RendezvousEndpoint::NamedPipe(name) => write!(formatter, "pipe {name}"),
            RendezvousEndpoint::SocketPath(path) => write!(formatter, "socket {}", path.display()),
            RendezvousEndpoint::Loopback(port) => {
                write!(formatter, "tcp {}:{port}", crate::LOOPBACK_HOSTNAME)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Windows,
    Unix,
}

impl HostPlatform {
    pub const fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else {
            HostPlatform::Unix
        }
    }
}

/// Computes the rendezvous endpoint. Stateless.
pub struct TransportResolver;

impl TransportResolver {
    /// Resolve the endpoint for the platform this binary runs on.
    pub fn resolve(config: &InstanceConfig) -> RendezvousEndpoint {
        Self::resolve_for(HostPlatform::current(), config)
    }

    /// Resolve the endpoint for an explicit platform.
    ///
    /// # Platform Behavior
    /// - **Windows**: `\\.\pipe\{app_identifier}`
    /// - **Unix**: `{socket_dir or temp_dir}/{app_identifier}`
    /// - **Loopback strategy**: `127.0.0.1:{loopback_port}` on any platform
    pub fn resolve_for(platform: HostPlatform, config: &InstanceConfig) -> RendezvousEndpoint {
        match (config.transport, platform) {
            (TransportStrategy::Loopback, _) => RendezvousEndpoint::Loopback(config.loopback_port),
            (TransportStrategy::Native, HostPlatform::Windows) => RendezvousEndpoint::NamedPipe(
                format!("{PIPE_NAMESPACE}{}", config.app_identifier),
            ),
            (TransportStrategy::Native, HostPlatform::Unix) => {
                let dir = config
                    .socket_dir
                    .clone()
                    .unwrap_or_else(std::env::temp_dir);
                RendezvousEndpoint::SocketPath(dir.join(&config.app_identifier))
            }
        }
    }
}
