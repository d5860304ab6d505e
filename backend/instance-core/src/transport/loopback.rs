use crate::LOOPBACK_HOSTNAME;
use crate::error::instance::InstanceError;
use crate::protocol::read_message_line;
use crate::transport::RendezvousListener;

use std::io::Result as IoResult;

use tokio::net::{TcpListener, TcpStream};

pub struct LoopbackListener {
    listener: TcpListener,
}

impl LoopbackListener {
    /// Bind `127.0.0.1:{port}`.
    pub async fn bind(port: u16) -> IoResult<Self> {
        let listener = TcpListener::bind((LOOPBACK_HOSTNAME, port)).await?;
        Ok(Self { listener })
    }
}

impl RendezvousListener for LoopbackListener {
    async fn accept_line(&mut self) -> Result<Option<String>, InstanceError> {
        let (stream, _addr) = self.listener.accept().await?;
        read_message_line(stream).await
    }
}

pub async fn connect(port: u16) -> IoResult<TcpStream> {
    TcpStream::connect((LOOPBACK_HOSTNAME, port)).await
}
