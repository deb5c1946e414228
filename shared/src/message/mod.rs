//! Bus message types
//!
//! Shared between the order server and its subscribers, for both in-process
//! (memory) and network (TCP) delivery.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

use crate::order::OrderEvent;

pub mod payload;
pub use payload::*;

/// Protocol version
pub const PROTOCOL_VERSION: u16 = 1;

/// Bus event type, one byte on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Subscriber handshake
    Handshake = 0,
    /// Human-facing notification (waiter calls, operator alerts)
    Notification = 1,
    /// Committed order change
    OrderEvent = 2,
    /// Resync signal
    Sync = 3,
    /// Reply to a handshake
    Response = 4,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::Notification),
            2 => Ok(EventType::OrderEvent),
            3 => Ok(EventType::Sync),
            4 => Ok(EventType::Response),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::Notification => write!(f, "notification"),
            EventType::OrderEvent => write!(f, "order_event"),
            EventType::Sync => write!(f, "sync"),
            EventType::Response => write!(f, "response"),
        }
    }
}

/// Bus message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    pub correlation_id: Option<Uuid>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            correlation_id: None,
            payload,
        }
    }

    /// Set the id of the message this one answers
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn handshake(payload: &HandshakePayload) -> Self {
        Self::new(
            EventType::Handshake,
            serde_json::to_vec(payload).expect("Failed to serialize handshake payload"),
        )
    }

    pub fn notification(payload: &NotificationPayload) -> Self {
        Self::new(
            EventType::Notification,
            serde_json::to_vec(payload).expect("Failed to serialize notification"),
        )
    }

    pub fn order_event(event: &OrderEvent) -> Self {
        Self::new(
            EventType::OrderEvent,
            serde_json::to_vec(event).expect("Failed to serialize order event"),
        )
    }

    pub fn sync(payload: &SyncPayload) -> Self {
        Self::new(
            EventType::Sync,
            serde_json::to_vec(payload).expect("Failed to serialize sync payload"),
        )
    }

    pub fn response(payload: &ResponsePayload) -> Self {
        Self::new(
            EventType::Response,
            serde_json::to_vec(payload).expect("Failed to serialize response payload"),
        )
    }

    /// Decode the payload
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}
