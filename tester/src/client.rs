//! Request/response transport used by the harness consumers.

use crate::error::ClientError;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Sends one protocol message and waits for the single-line reply.
///
/// Implementations own their connection; a client is used by exactly one
/// consumer at a time.
#[async_trait]
pub trait Client: Send {
    /// Send `message` (without trailing newline) and return the reply with
    /// its line terminator stripped.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the message cannot be delivered or no
    /// reply line arrives.
    async fn send(&mut self, message: &str) -> Result<String, ClientError>;
}

#[async_trait]
impl<C: Client + ?Sized> Client for Box<C> {
    async fn send(&mut self, message: &str) -> Result<String, ClientError> {
        (**self).send(message).await
    }
}

/// A persistent TCP connection to the booking server.
///
/// The same buffered reader is kept for the lifetime of the client so no
/// reply bytes are lost between requests.
#[derive(Debug)]
pub struct TcpClient {
    address: String,
    stream: BufReader<TcpStream>,
}

impl TcpClient {
    /// Open a connection to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the server cannot be reached.
    pub async fn connect(address: impl Into<String>) -> Result<Self, ClientError> {
        let address = address.into();
        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| ClientError::Connect {
                address: address.clone(),
                source,
            })?;
        // One small write per request, the reply is awaited immediately after.
        stream.set_nodelay(true).map_err(|source| ClientError::Connect {
            address: address.clone(),
            source,
        })?;

        debug!(%address, "Connected to server");
        Ok(Self {
            address,
            stream: BufReader::new(stream),
        })
    }
}

#[async_trait]
impl Client for TcpClient {
    async fn send(&mut self, message: &str) -> Result<String, ClientError> {
        let mut frame = String::with_capacity(message.len() + 1);
        frame.push_str(message);
        frame.push('\n');

        let write = async {
            let socket = self.stream.get_mut();
            socket.write_all(frame.as_bytes()).await?;
            socket.flush().await
        };
        write.await.map_err(|source| ClientError::Write {
            address: self.address.clone(),
            source,
        })?;

        let mut reply = String::new();
        let read = self
            .stream
            .read_line(&mut reply)
            .await
            .map_err(|source| ClientError::Read {
                address: self.address.clone(),
                source,
            })?;
        if read == 0 {
            return Err(ClientError::ConnectionClosed {
                address: self.address.clone(),
            });
        }

        Ok(reply.trim_end_matches(['\n', '\r']).to_string())
    }
}
