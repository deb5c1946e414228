use crate::order::Topic;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==================== Notification Level ====================

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Server health, counters, storage
    System,
    /// A diner asked for a waiter
    WaiterCall,
    /// Orders and payments
    Business,
}

// ==================== Payloads ====================

/// Handshake (subscriber -> server)
///
/// Carries the protocol version and the single topic this connection
/// subscribes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// Protocol version
    pub version: u16,
    /// Subscription scope
    pub topic: Topic,
    /// Client display name
    pub client_name: Option<String>,
    /// Client unique id (UUID)
    pub client_id: Option<String>,
}

/// Notification (server -> subscriber)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    /// Extra JSON
    pub data: Option<serde_json::Value>,
}

/// Resync signal (server -> subscriber)
///
/// Tells the subscriber its view may be stale and it should fetch the queue
/// again before applying further events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Why the subscriber should refetch, e.g. "lagged"
    pub reason: String,
    /// Events lost to channel overflow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped_messages: Option<u64>,
}

impl SyncPayload {
    pub fn lagged(dropped_messages: u64) -> Self {
        Self {
            reason: "lagged".to_string(),
            dropped_messages: Some(dropped_messages),
        }
    }
}

/// Generic response (server -> subscriber)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error code, only on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

// ==================== Convenience Constructors ====================

impl NotificationPayload {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Info,
            category: NotificationCategory::System,
            data: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Warning,
            category: NotificationCategory::System,
            data: None,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Error,
            category: NotificationCategory::System,
            data: None,
        }
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl ResponsePayload {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error_code: code,
        }
    }
}
