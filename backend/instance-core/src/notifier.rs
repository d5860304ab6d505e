//! Secondary-side, fire-and-forget activation signal.

use crate::endpoint::RendezvousEndpoint;
use crate::error::instance::InstanceError;
use crate::protocol::ActivationMessage;
use crate::transport::{loopback, send_line};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use tokio::time::timeout as TokioTimeout;

/// Ask the primary at `endpoint` to bring its window to the front.
///
/// Never fails: the usual cause of a failure is a primary that exited a moment
/// ago, and the caller's next step is to exit anyway. Returns within roughly
/// `timeout` even if nobody is listening.
pub async fn notify_primary(endpoint: &RendezvousEndpoint, timeout: Duration) {
    match try_notify_primary(endpoint, timeout).await {
        Ok(()) => info!("Activation signal sent to primary instance at {endpoint}"),
        Err(e) => debug!("Could not notify primary instance at {endpoint}: {e}"),
    }
}

/// Like [`notify_primary`], but reports why the signal could not be delivered.
///
/// # Errors
///
/// - [`InstanceError::Timeout`] if connecting and writing took longer than `timeout`
/// - [`InstanceError::Connect`] / [`InstanceError::Io`] if no primary accepted the connection
pub async fn try_notify_primary(
    endpoint: &RendezvousEndpoint,
    timeout: Duration,
) -> Result<(), InstanceError> {
    TokioTimeout(timeout, send_activation(endpoint, timeout))
        .await
        .map_err(|_| InstanceError::Timeout {
            message: format!("Notifying {endpoint} took longer than {timeout:?}"),
            location: ErrorLocation::from(Location::caller()),
        })?
}

async fn send_activation(
    endpoint: &RendezvousEndpoint,
    timeout: Duration,
) -> Result<(), InstanceError> {
    match endpoint {
        RendezvousEndpoint::SocketPath(path) => send_over_socket(path).await,
        RendezvousEndpoint::NamedPipe(name) => send_over_pipe(name, timeout).await,
        RendezvousEndpoint::Loopback(port) => {
            let stream = loopback::connect(*port).await?;
            send_line(stream, ActivationMessage::LINE).await
        }
    }
}

#[cfg(unix)]
async fn send_over_socket(path: &Path) -> Result<(), InstanceError> {
    let stream = crate::transport::unix_socket::connect(path).await?;
    send_line(stream, ActivationMessage::LINE).await
}

#[cfg(not(unix))]
async fn send_over_socket(path: &Path) -> Result<(), InstanceError> {
    Err(InstanceError::Connect {
        message: format!("Socket transport unavailable for {}", path.display()),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// The pipe may be busy serving another secondary; `deadline` bounds the retries.
#[cfg(windows)]
async fn send_over_pipe(name: &str, deadline: Duration) -> Result<(), InstanceError> {
    let client = crate::transport::named_pipe::connect(name, deadline).await?;
    send_line(client, ActivationMessage::LINE).await
}

#[cfg(not(windows))]
async fn send_over_pipe(name: &str, _deadline: Duration) -> Result<(), InstanceError> {
    Err(InstanceError::Connect {
        message: format!("Named pipe transport unavailable for {name}"),
        location: ErrorLocation::from(Location::caller()),
    })
}
