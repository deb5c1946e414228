//! Memory transport (same process)

use std::sync::Arc;

use async_trait::async_trait;
use shared::message::{BusMessage, SyncPayload};
use tokio::sync::Mutex;
use tokio::sync::broadcast;

use super::Transport;
use crate::utils::AppError;

/// In-process subscriber to one topic channel
///
/// Behaves like a TCP subscriber: overflow turns into a `Sync` message
/// instead of an error. Writes go nowhere; the bus only talks one way.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
}

impl MemoryTransport {
    pub fn new(rx: broadcast::Receiver<BusMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Ok(msg) => Ok(msg),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                Ok(BusMessage::sync(&SyncPayload::lagged(n)))
            }
            Err(broadcast::error::RecvError::Closed) => Err(AppError::client_disconnected()),
        }
    }

    async fn write_message(&self, _msg: &BusMessage) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }
}
