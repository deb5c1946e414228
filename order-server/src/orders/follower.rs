//! Role queue follower
//!
//! Keeps a [`QueueView`] current from two inputs:
//!
//! ```text
//!   topic frames ──▶ apply(event) ──┐
//!                                   ├──▶ QueueView ──▶ list()
//!   interval tick ─▶ fetch snapshot ┘
//! ```
//!
//! Live events are only a fast path. The periodic fetch replaces the whole
//! view, so a dropped or reordered event can leave the view stale for at
//! most one interval. A `Sync` frame or an epoch change triggers an
//! immediate fetch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::message::{BusMessage, EventType};
use shared::order::{ApplyOutcome, Order, OrderEvent, QueueKind, QueueSnapshot, QueueView};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::manager::OrdersManager;
use crate::message::Transport;
use crate::utils::{AppError, ErrorCode};

/// Frames buffered between the socket reader and the follower loop
const READ_BUFFER: usize = 256;

/// Where authoritative queue contents come from
#[async_trait]
pub trait QueueSource: Send + Sync {
    async fn fetch(&self, kind: &QueueKind) -> Result<QueueSnapshot, AppError>;
}

#[async_trait]
impl QueueSource for OrdersManager {
    async fn fetch(&self, kind: &QueueKind) -> Result<QueueSnapshot, AppError> {
        Ok(self.queue_snapshot(kind)?)
    }
}

/// What one inbound frame did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Applied(ApplyOutcome),
    Reconciled,
    Ignored,
}

/// Live + poll driver for one role queue
pub struct QueueFollower {
    view: RwLock<QueueView>,
    source: Arc<dyn QueueSource>,
    interval: Duration,
}

impl std::fmt::Debug for QueueFollower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueFollower")
            .field("kind", self.view.read().kind())
            .field("interval", &self.interval)
            .finish()
    }
}

impl QueueFollower {
    pub fn new(kind: QueueKind, source: Arc<dyn QueueSource>, interval: Duration) -> Self {
        Self {
            view: RwLock::new(QueueView::new(kind)),
            source,
            interval,
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.view.read().kind().clone()
    }

    /// Current queue, oldest first
    pub fn list(&self) -> Vec<Order> {
        self.view.read().list()
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.view.read().contains(order_id)
    }

    /// Highest sequence the last fetch reflected
    pub fn watermark(&self) -> u64 {
        self.view.read().watermark()
    }

    /// Replace the view with a fresh snapshot
    pub async fn reconcile(&self) -> Result<(), AppError> {
        let kind = self.kind();
        let snapshot = self.source.fetch(&kind).await?;
        let (count, sequence) = (snapshot.orders.len(), snapshot.server_sequence);
        self.view.write().reconcile(snapshot);
        tracing::debug!(queue = ?kind, orders = count, sequence, "Queue reconciled");
        Ok(())
    }

    /// Apply one frame from the topic
    pub async fn handle_message(&self, msg: &BusMessage) -> Result<FollowOutcome, AppError> {
        match msg.event_type {
            EventType::OrderEvent => {
                let event: OrderEvent = msg
                    .parse_payload()
                    .map_err(|e| AppError::invalid(format!("Invalid order event: {}", e)))?;
                let outcome = self.view.write().apply(&event);
                if outcome == ApplyOutcome::NeedsReconcile {
                    self.reconcile().await?;
                    return Ok(FollowOutcome::Reconciled);
                }
                Ok(FollowOutcome::Applied(outcome))
            }
            EventType::Sync => {
                tracing::info!(queue = ?self.kind(), "Resync requested by server");
                self.reconcile().await?;
                Ok(FollowOutcome::Reconciled)
            }
            _ => Ok(FollowOutcome::Ignored),
        }
    }

    /// Follow `transport` until cancelled or the connection drops
    ///
    /// Fetches once before reading any frame. A failed fetch is logged and
    /// retried on the next tick; the view keeps its last contents meanwhile.
    pub async fn run(
        &self,
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
    ) -> Result<(), AppError> {
        if let Err(e) = self.reconcile().await {
            tracing::warn!(queue = ?self.kind(), "Initial queue fetch failed: {}", e);
        }

        // Frame reads are not cancel-safe, so they run in their own task
        let (tx, mut rx) = mpsc::channel(READ_BUFFER);
        let reader_cancel = cancel.child_token();
        let reader = {
            let transport = transport.clone();
            let cancel = reader_cancel.clone();
            tokio::spawn(async move {
                loop {
                    let result = tokio::select! {
                        _ = cancel.cancelled() => break,
                        result = transport.read_message() => result,
                    };
                    let failed = result.is_err();
                    if tx.send(result).await.is_err() || failed {
                        break;
                    }
                }
            })
        };

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile().await {
                        tracing::warn!(queue = ?self.kind(), "Periodic queue fetch failed: {}", e);
                    }
                }
                frame = rx.recv() => match frame {
                    Some(Ok(msg)) => {
                        if let Err(e) = self.handle_message(&msg).await {
                            tracing::warn!(queue = ?self.kind(), "Frame not applied: {}", e);
                        }
                    }
                    Some(Err(e)) if e.code == ErrorCode::ClientDisconnected => {
                        tracing::info!(queue = ?self.kind(), "Event stream closed");
                        break Err(e);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(queue = ?self.kind(), "Event stream failed: {}", e);
                        break Err(e);
                    }
                    None => break Err(AppError::client_disconnected()),
                },
            }
        };

        reader_cancel.cancel();
        let _ = reader.await;
        result
    }
}
