//! Rendezvous transports.
//!
//! One variant per platform/strategy, chosen once at startup:
//!
//! - [`unix_socket`] - filesystem socket (Unix)
//! - [`named_pipe`] - named pipe (Windows)
//! - [`loopback`] - fixed TCP port on `127.0.0.1` (any platform)
//!
//! The listener loop only sees the [`RendezvousListener`] capability, so no
//! platform checks leak into it.

pub mod loopback;
#[cfg(windows)]
pub mod named_pipe;
#[cfg(unix)]
pub mod unix_socket;

use crate::error::instance::InstanceError;

use std::future::Future;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Accept side of a transport, held by the primary.
pub trait RendezvousListener: Send + 'static {
    /// Wait for one peer, read one line from it and release the connection.
    ///
    /// `Ok(None)` means the peer disconnected without sending anything.
    fn accept_line(
        &mut self,
    ) -> impl Future<Output = Result<Option<String>, InstanceError>> + Send;
}

/// The listener claimed by [`crate::binder::try_become_primary`].
///
/// Dropping it releases the OS primitive (socket, pipe or port).
pub enum BoundListener {
    #[cfg(unix)]
    UnixSocket(unix_socket::UnixSocketListener),
    #[cfg(windows)]
    NamedPipe(named_pipe::NamedPipeListener),
    Loopback(loopback::LoopbackListener),
}

impl BoundListener {
    /// Socket file owned by this listener, if the transport creates one.
    #[cfg(unix)]
    pub fn socket_artifact(&self) -> Option<unix_socket::SocketArtifact> {
        match self {
            BoundListener::UnixSocket(listener) => Some(listener.artifact().clone()),
            BoundListener::Loopback(_) => None,
        }
    }
}

impl RendezvousListener for BoundListener {
    async fn accept_line(&mut self) -> Result<Option<String>, InstanceError> {
        match self {
            #[cfg(unix)]
            BoundListener::UnixSocket(listener) => listener.accept_line().await,
            #[cfg(windows)]
            BoundListener::NamedPipe(listener) => listener.accept_line().await,
            BoundListener::Loopback(listener) => listener.accept_line().await,
        }
    }
}

/// Write one line, flush it and close the write side.
pub async fn send_line<W>(mut writer: W, line: &[u8]) -> Result<(), InstanceError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line).await?;
    writer.flush().await?;
    writer.shutdown().await?;
    Ok(())
}
