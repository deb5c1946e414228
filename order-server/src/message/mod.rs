//! Event bus
//!
//! - [`EventBus`]: one broadcast channel per [`Topic`], fan-out of order events
//! - [`topics_for`]: which topics an order event concerns
//! - [`transport`]: frame codec over TCP and in-process channels
//! - TCP subscriber server (`tcp_server`)

pub mod bus;
pub mod routing;
pub mod tcp_server;
pub mod transport;

use serde::Serialize;

pub use bus::{EventBus, TransportConfig};
pub use routing::{topic_for_queue, topics_for};
pub use shared::message::{BusMessage, EventType, NotificationPayload, SyncPayload};
pub use shared::order::Topic;
pub use transport::{MemoryTransport, TcpTransport, Transport};

/// A connected TCP subscriber
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClient {
    pub id: String,
    pub name: Option<String>,
    pub topic: Topic,
    pub addr: String,
    /// Unix millis
    pub connected_at: i64,
}
