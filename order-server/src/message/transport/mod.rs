//! Transport layer abstraction
//!
//! ```text
//!         ┌────────────────────┐
//!         │   Transport Trait  │
//!         └────────┬───────────┘
//!                  │
//!          ┌───────┴────────┐
//!          ▼                ▼
//!    TcpTransport    MemoryTransport
//!    (network)       (same process)
//! ```
//!
//! # Frame layout
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 1 | event type |
//! | 16 | request id |
//! | 16 | correlation id (nil = none) |
//! | 4 | payload length, u32 LE |
//! | n | JSON payload |

mod memory;
mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::message::{BusMessage, EventType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::utils::AppError;

/// Frames larger than this are rejected before allocating
pub const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

/// A bidirectional message channel
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Read one message
    async fn read_message(&self) -> Result<BusMessage, AppError>;

    /// Write one message
    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError>;

    async fn close(&self) -> Result<(), AppError>;

    /// Peer address, if networked
    fn peer_addr(&self) -> Option<String> {
        None
    }
}

// ========== Helpers ==========

/// Read one frame
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, AppError> {
    // Event type (1 byte)
    let mut type_buf = [0u8; 1];
    match reader.read_exact(&mut type_buf).await {
        Ok(_) => {}
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ) =>
        {
            return Err(AppError::client_disconnected());
        }
        Err(e) => return Err(AppError::internal(format!("Read type failed: {}", e))),
    }

    let event_type =
        EventType::try_from(type_buf[0]).map_err(|_| AppError::invalid("Invalid event type"))?;

    // Request ID (16 bytes)
    let mut uuid_buf = [0u8; 16];
    reader
        .read_exact(&mut uuid_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read UUID failed: {}", e)))?;
    let request_id = Uuid::from_bytes(uuid_buf);

    // Correlation ID (16 bytes)
    let mut correlation_buf = [0u8; 16];
    reader
        .read_exact(&mut correlation_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read Correlation UUID failed: {}", e)))?;
    let correlation_id = Some(Uuid::from_bytes(correlation_buf)).filter(|id| !id.is_nil());

    // Payload length (4 bytes)
    let mut len_buf = [0u8; 4];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| AppError::internal(format!("Read len failed: {}", e)))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_PAYLOAD_BYTES {
        return Err(AppError::invalid(format!(
            "Payload of {} bytes exceeds limit of {}",
            len, MAX_PAYLOAD_BYTES
        )));
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| AppError::internal(format!("Read payload failed: {}", e)))?;

    Ok(BusMessage {
        request_id,
        event_type,
        correlation_id,
        payload,
    })
}

/// Write one frame
pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), AppError> {
    let mut data = Vec::with_capacity(37 + msg.payload.len());
    data.push(msg.event_type as u8);
    data.extend_from_slice(msg.request_id.as_bytes());
    data.extend_from_slice(msg.correlation_id.unwrap_or(Uuid::nil()).as_bytes());
    data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
    data.extend_from_slice(&msg.payload);

    writer
        .write_all(&data)
        .await
        .map_err(|e| AppError::internal(format!("Write failed: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| AppError::internal(format!("Flush failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;
    use shared::message::SyncPayload;

    #[tokio::test]
    async fn test_frame_preserves_envelope() {
        let msg = BusMessage::sync(&SyncPayload::lagged(3)).with_correlation_id(Uuid::new_v4());
        let mut buf = Vec::new();
        write_to_stream(&mut buf, &msg).await.unwrap();
        assert_eq!(buf.len(), 37 + msg.payload.len());

        let decoded = read_from_stream(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded, msg);
    }

    #[tokio::test]
    async fn test_nil_correlation_reads_as_none() {
        let msg = BusMessage::sync(&SyncPayload::lagged(1));
        let mut buf = Vec::new();
        write_to_stream(&mut buf, &msg).await.unwrap();
        let decoded = read_from_stream(&mut buf.as_slice()).await.unwrap();
        assert_eq!(decoded.correlation_id, None);
    }

    #[tokio::test]
    async fn test_empty_stream_is_disconnect() {
        let err = read_from_stream(&mut [].as_slice()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ClientDisconnected);
    }

    #[tokio::test]
    async fn test_oversized_and_unknown_frames_rejected() {
        let mut frame = vec![EventType::Sync as u8];
        frame.extend_from_slice(&[0u8; 32]);
        frame.extend_from_slice(&((MAX_PAYLOAD_BYTES as u32) + 1).to_le_bytes());
        let err = read_from_stream(&mut frame.as_slice()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);

        let unknown = [0xFFu8; 37];
        let err = read_from_stream(&mut unknown.as_slice()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }
}
