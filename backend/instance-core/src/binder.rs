//! Claims the rendezvous endpoint.
//!
//! Exclusivity comes from the OS primitive (socket bind, first pipe instance,
//! port bind). Every failure is read as "another instance is primary": a false
//! secondary is preferable to two primaries.
//!
//! A socket file is not exclusive by itself once it goes stale, so launches
//! racing for the same path take an advisory lock on `<socket>.lock` around
//! probe, removal and bind.

use crate::endpoint::RendezvousEndpoint;
use crate::error::instance::InstanceError;
use crate::transport::BoundListener;
use crate::transport::loopback::LoopbackListener;

use common::ErrorLocation;

use std::fmt::Display;
use std::panic::Location;
use std::path::Path;

use log::info;

/// Try to become the primary instance for `endpoint`.
///
/// # Returns
///
/// * `Some(BoundListener)` - this process is primary and owns the endpoint
/// * `None` - another process owns it, or binding failed for any reason
pub async fn try_become_primary(endpoint: &RendezvousEndpoint) -> Option<BoundListener> {
    match claim_endpoint(endpoint).await {
        Ok(Some(listener)) => {
            info!("Claimed {endpoint}");
            Some(listener)
        }
        Ok(None) => {
            info!("Another instance is listening on {endpoint}, becoming secondary");
            None
        }
        Err(e) => {
            info!("{endpoint} unavailable, assuming another instance: {e}");
            None
        }
    }
}

/// Claim `endpoint`.
///
/// `Ok(None)` means a live primary answered; [`InstanceError::Bind`] means the
/// OS refused the primitive, usually because another process holds it.
pub(crate) async fn claim_endpoint(
    endpoint: &RendezvousEndpoint,
) -> Result<Option<BoundListener>, InstanceError> {
    match endpoint {
        RendezvousEndpoint::SocketPath(path) => claim_unix_socket(path).await,
        RendezvousEndpoint::NamedPipe(name) => claim_named_pipe(name),
        RendezvousEndpoint::Loopback(port) => LoopbackListener::bind(*port)
            .await
            .map(|listener| Some(BoundListener::Loopback(listener)))
            .map_err(|e| bind_error(endpoint, e)),
    }
}

#[track_caller]
fn bind_error(endpoint: impl Display, cause: impl Display) -> InstanceError {
    InstanceError::Bind {
        message: format!("Cannot claim {endpoint}: {cause}"),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// `Ok(None)` means a live primary answered on the socket.
#[cfg(unix)]
async fn claim_unix_socket(path: &Path) -> Result<Option<BoundListener>, InstanceError> {
    use crate::transport::unix_socket::{ClaimLock, UnixSocketListener, socket_inode};
    use log::{debug, warn};

    let endpoint = path.display();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| bind_error(&endpoint, e))?;
    }

    let _lock = ClaimLock::acquire(path)
        .await
        .map_err(|e| bind_error(&endpoint, e))?;

    if let Some(inode) = socket_inode(path) {
        if stale::probe_is_alive(path).await {
            return Ok(None);
        }

        if socket_inode(path) == Some(inode) {
            warn!("Removing stale socket {endpoint}");
            if let Err(e) = std::fs::remove_file(path) {
                debug!("Failed to remove stale socket {endpoint}: {e}");
            }
        }
    }

    let listener = UnixSocketListener::bind(path).map_err(|e| bind_error(&endpoint, e))?;

    // Still under the lock: the path must point at the socket just bound.
    if !listener.artifact().is_current() {
        return Err(bind_error(&endpoint, "socket file replaced during bind"));
    }

    Ok(Some(BoundListener::UnixSocket(listener)))
}

#[cfg(not(unix))]
async fn claim_unix_socket(path: &Path) -> Result<Option<BoundListener>, InstanceError> {
    Err(bind_error(
        path.display(),
        "socket transport is not available on this platform",
    ))
}

#[cfg(windows)]
fn claim_named_pipe(name: &str) -> Result<Option<BoundListener>, InstanceError> {
    use crate::transport::named_pipe::NamedPipeListener;

    NamedPipeListener::create(name)
        .map(|listener| Some(BoundListener::NamedPipe(listener)))
        .map_err(|e| bind_error(name, e))
}

#[cfg(not(windows))]
fn claim_named_pipe(name: &str) -> Result<Option<BoundListener>, InstanceError> {
    Err(bind_error(name, "named pipes are not available on this platform"))
}

#[cfg(unix)]
pub(crate) mod stale {
    use crate::transport::unix_socket::connect;

    use std::path::Path;
    use std::time::Duration;

    use backoff::{ExponentialBackoff, backoff::Backoff};
    use log::trace;
    use tokio::time::sleep as TokioSleep;

    const PROBE_RETRY_INITIAL: Duration = Duration::from_millis(10);
    const PROBE_RETRY_MAX: Duration = Duration::from_millis(40);
    const PROBE_MAX_ELAPSED: Duration = Duration::from_millis(100);

    /// Whether something accepts connections on the socket at `path`.
    ///
    /// A peer that has bound but not yet called `listen()` refuses connections
    /// for a moment, so refusals are retried briefly before the socket is
    /// considered stale.
    pub(crate) async fn probe_is_alive(path: &Path) -> bool {
        let mut backoff = ExponentialBackoff {
            initial_interval: PROBE_RETRY_INITIAL,
            current_interval: PROBE_RETRY_INITIAL,
            max_interval: PROBE_RETRY_MAX,
            max_elapsed_time: Some(PROBE_MAX_ELAPSED),
            ..Default::default()
        };

        loop {
            match connect(path).await {
                Ok(_probe) => return true,
                Err(e) => match backoff.next_backoff() {
                    Some(duration) => {
                        trace!("Probe of {} failed ({e}), retrying", path.display());
                        TokioSleep(duration).await;
                    }
                    None => return false,
                },
            }
        }
    }
}
