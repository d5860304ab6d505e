//! Wire format: one UTF-8 line, `Activate\n`, no reply.

use crate::error::instance::InstanceError;

use common::ErrorLocation;

use std::panic::Location;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Longest line the listener accepts, excluding the terminator.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// The only message the protocol knows.
pub struct ActivationMessage;

impl ActivationMessage {
    pub const TOKEN: &'static str = "Activate";

    /// Token plus line terminator, as written by the notifier.
    pub const LINE: &'static [u8] = b"Activate\n";

    pub fn matches(line: &str) -> bool {
        line == Self::TOKEN
    }
}

/// Read a single line from a freshly accepted connection.
///
/// Returns `Ok(None)` when the peer closed without sending anything (for
/// example another launch probing whether the endpoint is alive). A line
/// without terminator is accepted if the peer closed after it.
///
/// # Errors
///
/// - [`InstanceError::Io`] on read failure
/// - [`InstanceError::Protocol`] if the line exceeds [`MAX_MESSAGE_BYTES`]
///   or is not valid UTF-8
pub async fn read_message_line<R>(reader: R) -> Result<Option<String>, InstanceError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader.take(MAX_MESSAGE_BYTES as u64 + 1));
    let mut buffer = Vec::new();

    let read = reader.read_until(b'\n', &mut buffer).await?;
    if read == 0 {
        return Ok(None);
    }

    if buffer.last() == Some(&b'\n') {
        buffer.pop();
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
    } else if buffer.len() > MAX_MESSAGE_BYTES {
        return Err(InstanceError::Protocol {
            message: format!("Message exceeds {MAX_MESSAGE_BYTES} bytes"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    String::from_utf8(buffer)
        .map(Some)
        .map_err(|e| InstanceError::Protocol {
            message: format!("Message is not valid UTF-8: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
