//! Shared types for the order platform
//!
//! Domain, wire and error types used by the order server and by role
//! clients (kitchen, waiter, checkout, table displays).

pub mod error;
pub mod message;
pub mod order;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, EventType};
