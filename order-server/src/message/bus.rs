//! Topic-scoped event bus
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      EventBus                        │
//! │  DashMap<Topic, broadcast::Sender<BusMessage>>       │
//! │   role:Kitchen  role:Waiter  ...  table:5  table:7   │
//! └───────────────────────┬──────────────────────────────┘
//!                         │
//!              ┌──────────┴──────────┐
//!              │   Transport Trait   │
//!              └──────────┬──────────┘
//!                ┌────────┴────────┐
//!                ▼                 ▼
//!          TcpTransport     MemoryTransport
//! ```
//!
//! Delivery is at-most-once and best-effort. A subscriber that falls behind
//! gets a `Sync` frame and must refetch its queue; nothing is persisted or
//! replayed. Publishing to a topic nobody listens to is not an error.

use std::sync::Arc;

use dashmap::DashMap;
use shared::message::{BusMessage, NotificationPayload};
use shared::order::{OrderEvent, Topic};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::ConnectedClient;
use super::routing::topics_for;
use super::transport::MemoryTransport;

/// Configuration for transport layer
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// Capacity of each topic's broadcast channel (default: 1024)
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// Event bus: one broadcast channel per topic
#[derive(Debug, Clone)]
pub struct EventBus {
    channels: Arc<DashMap<Topic, broadcast::Sender<BusMessage>>>,
    pub(crate) config: TransportConfig,
    shutdown_token: CancellationToken,
    /// Connected TCP subscribers (client id -> info)
    pub(crate) clients: Arc<DashMap<String, ConnectedClient>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::from_config(TransportConfig::default())
    }

    pub fn from_config(config: TransportConfig) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(TransportConfig {
            channel_capacity: capacity.max(1),
            ..Default::default()
        })
    }

    /// Receive every frame published to `topic` from now on
    pub fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<BusMessage> {
        let capacity = self.config.channel_capacity.max(1);
        self.channels
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe()
    }

    /// In-process subscriber for `topic`
    pub fn memory_transport(&self, topic: &Topic) -> MemoryTransport {
        MemoryTransport::new(self.subscribe(topic))
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.channels
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Topics that currently have a channel
    pub fn topics(&self) -> Vec<Topic> {
        self.channels.iter().map(|e| e.key().clone()).collect()
    }

    /// Send one frame to one topic, returning how many receivers got it
    pub fn publish_to(&self, topic: &Topic, msg: BusMessage) -> usize {
        let delivered = match self.channels.get(topic) {
            Some(tx) => tx.send(msg).unwrap_or(0),
            None => return 0,
        };

        // Table channels come and go with diners; drop them once unused.
        // The map guard above is released before removing, or the shard
        // lock would deadlock.
        if delivered == 0 && matches!(topic, Topic::Table(_)) {
            self.channels.remove_if(topic, |_, tx| tx.receiver_count() == 0);
        }
        delivered
    }

    /// Fan a committed order event out to every topic it concerns
    pub fn publish_order_event(&self, event: &OrderEvent) -> usize {
        let msg = BusMessage::order_event(event);
        let topics = topics_for(event);
        let delivered: usize = topics
            .iter()
            .map(|topic| self.publish_to(topic, msg.clone()))
            .sum();
        tracing::debug!(
            order_id = %event.order.id,
            event_type = %event.event_type,
            sequence = event.sequence,
            topics = topics.len(),
            delivered,
            "Order event published"
        );
        delivered
    }

    pub fn notify(&self, topic: &Topic, payload: &NotificationPayload) -> usize {
        self.publish_to(topic, BusMessage::notification(payload))
    }

    /// Send one frame to every topic with a channel
    pub fn broadcast_all(&self, msg: BusMessage) -> usize {
        self.topics()
            .iter()
            .map(|topic| self.publish_to(topic, msg.clone()))
            .sum()
    }

    pub fn get_connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients.iter().map(|e| e.value().clone()).collect()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Stop the TCP server and every connection handler
    pub fn shutdown(&self) {
        tracing::info!("Shutting down event bus");
        self.shutdown_token.cancel();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
