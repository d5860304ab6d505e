use crate::error::instance::InstanceError;
use crate::protocol::read_message_line;
use crate::transport::RendezvousListener;

use common::ErrorLocation;

use std::io::{ErrorKind, Result as IoResult};
use std::panic::Location;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::trace;
use tokio::net::windows::named_pipe::{
    ClientOptions, NamedPipeClient, NamedPipeServer, PipeMode, ServerOptions,
};
use tokio::time::sleep as TokioSleep;

/// `ERROR_PIPE_BUSY`: the only server instance is serving another client.
const ERROR_PIPE_BUSY: i32 = 231;
const CONNECT_RETRY_INITIAL: Duration = Duration::from_millis(10);
const CONNECT_RETRY_MAX: Duration = Duration::from_millis(50);

/// Single inbound pipe instance, reused for every client via disconnect.
pub struct NamedPipeListener {
    server: NamedPipeServer,
}

impl NamedPipeListener {
    /// Create the first instance of the pipe. Fails if any process already owns the name.
    pub fn create(name: &str) -> IoResult<Self> {
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .access_outbound(false)
            .pipe_mode(PipeMode::Byte)
            .max_instances(1)
            .create(name)?;

        Ok(Self { server })
    }
}

impl RendezvousListener for NamedPipeListener {
    async fn accept_line(&mut self) -> Result<Option<String>, InstanceError> {
        self.server.connect().await?;

        let line = read_message_line(&mut self.server).await;
        let disconnected = self.server.disconnect();

        let line = line?;
        disconnected?;
        Ok(line)
    }
}

/// Open the client end, retrying while the single server instance is busy.
///
/// # Errors
///
/// - [`InstanceError::Connect`] if the pipe does not exist or stays busy past `deadline`
/// - [`InstanceError::Io`] for any other open failure
pub async fn connect(name: &str, deadline: Duration) -> Result<NamedPipeClient, InstanceError> {
    let mut backoff = ExponentialBackoff {
        initial_interval: CONNECT_RETRY_INITIAL,
        current_interval: CONNECT_RETRY_INITIAL,
        max_interval: CONNECT_RETRY_MAX,
        max_elapsed_time: Some(deadline),
        ..Default::default()
    };

    loop {
        match ClientOptions::new().read(false).write(true).open(name) {
            Ok(client) => return Ok(client),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(InstanceError::Connect {
                    message: format!("No pipe named {name}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Pipe {name} busy, retrying after {duration:?}");
                    TokioSleep(duration).await;
                }
                None => {
                    return Err(InstanceError::Connect {
                        message: format!("Pipe {name} stayed busy for {deadline:?}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            },
            Err(e) => return Err(e.into()),
        }
    }
}
