//! TCP transport

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::ErrorCode;
use shared::message::{BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, ResponsePayload};
use shared::order::Topic;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use super::{Transport, read_from_stream, write_to_stream};
use crate::utils::AppError;

/// TCP transport
///
/// Read and write halves are locked separately, so a task blocked reading
/// never holds up a writer.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    addr: Option<String>,
}

impl TcpTransport {
    /// Connect to `addr`
    pub async fn connect(addr: &str) -> Result<Self, AppError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| {
                AppError::with_message(ErrorCode::NetworkError, format!("TCP connect failed: {}", e))
            })?;
        Ok(Self::from_stream(stream))
    }

    /// Connect and subscribe to `topic`
    ///
    /// Returns once the server has acknowledged the handshake; every frame
    /// read afterwards belongs to `topic`.
    pub async fn subscribe(
        addr: &str,
        topic: Topic,
        client_name: Option<String>,
    ) -> Result<Self, AppError> {
        let transport = Self::connect(addr).await?;
        let handshake = BusMessage::handshake(&HandshakePayload {
            version: PROTOCOL_VERSION,
            topic,
            client_name,
            client_id: Some(uuid::Uuid::new_v4().to_string()),
        });
        transport.write_message(&handshake).await?;

        let reply = transport.read_message().await?;
        if reply.event_type != EventType::Response
            || reply.correlation_id != Some(handshake.request_id)
        {
            return Err(AppError::invalid(format!(
                "Expected handshake response, got {}",
                reply.event_type
            )));
        }
        let payload: ResponsePayload = reply
            .parse_payload()
            .map_err(|e| AppError::invalid(format!("Invalid handshake response: {}", e)))?;
        if !payload.success {
            return Err(AppError::with_message(ErrorCode::InvalidRequest, payload.message));
        }
        Ok(transport)
    }

    /// Wrap an accepted stream
    pub fn from_stream(stream: TcpStream) -> Self {
        let _ = stream.set_nodelay(true);
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (reader, writer) = stream.into_split();
        Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
            addr: peer_addr,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut reader = self.reader.lock().await;
        read_from_stream(&mut *reader).await
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;
        write_to_stream(&mut *writer, msg).await
    }

    async fn close(&self) -> Result<(), AppError> {
        let mut writer = self.writer.lock().await;
        writer
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("TCP close failed: {}", e)))?;
        Ok(())
    }

    fn peer_addr(&self) -> Option<String> {
        self.addr.clone()
    }
}
