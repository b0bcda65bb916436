//! TCP transport provider.
//!
//! Wraps a connected `tokio::net::TcpStream` as a [`StreamPort`]. The
//! stream is split so the two pumps can read and write concurrently; each
//! half sits behind its own async mutex, which is uncontended in practice
//! because only one pump touches each half.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use taut_protocol::StreamPort;

use crate::config::Endpoint;
use crate::error::{Error, Result};

/// A connected TCP stream behind the [`StreamPort`] contract.
pub struct TcpStreamPort {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpStreamPort {
    pub fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl StreamPort for TcpStreamPort {
    async fn read(&self, buf: &mut [u8]) -> taut_protocol::Result<usize> {
        let mut reader = self.reader.lock().await;
        match reader.read(buf).await {
            // EOF: the server closed the connection.
            Ok(0) => Err(taut_protocol::Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) => Err(taut_protocol::Error::Connection(e.to_string())),
        }
    }

    async fn write_all(&self, bytes: &[u8]) -> taut_protocol::Result<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| taut_protocol::Error::Connection(e.to_string()))
    }
}

/// Connects to the server endpoint.
pub async fn connect(endpoint: &Endpoint) -> Result<TcpStreamPort> {
    log::info!("connecting to {}", endpoint);
    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| Error::Provision(format!("failed to connect to {}: {}", endpoint, e)))?;

    // Frames are small and latency matters more than throughput here.
    stream
        .set_nodelay(true)
        .map_err(|e| Error::Provision(format!("failed to set TCP_NODELAY: {}", e)))?;

    log::debug!("connected to {}", endpoint);
    Ok(TcpStreamPort::new(stream))
}
