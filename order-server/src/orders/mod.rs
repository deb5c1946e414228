//! Order lifecycle
//!
//! - **storage**: redb persistence, conditional updates, day counters
//! - **sequence**: per-day human order numbers
//! - **machine**: the transition rules
//! - **manager**: `OrdersManager`, the only writer of order state
//! - **queues**: role-scoped reads
//! - **checkout**: per-table bill merge and settlement
//! - **follower**: live + poll driver for a role queue view
//! - **sync**: reconnect reconciliation
//!
//! # Data Flow
//!
//! ```text
//! HTTP call → OrdersManager → conditional write (redb) → commit
//!                  ↓
//!             OrderEvent ──▶ EventRouter ──▶ EventBus topics ──▶ subscribers
//! ```
//!
//! An event is only ever emitted after its write has committed, and carries
//! the full post-write order.

pub mod checkout;
pub mod follower;
pub mod machine;
pub mod manager;
pub mod queues;
pub mod sequence;
pub mod storage;
pub mod sync;

// Re-exports
pub use checkout::{CheckoutError, CheckoutMerger, CheckoutResult};
pub use follower::{FollowOutcome, QueueFollower, QueueSource};
pub use machine::Transition;
pub use manager::{ManagerConfig, ManagerError, ManagerResult, OrdersManager, SettleOutcome};
pub use sequence::{SequenceGenerator, SequencePolicy};
pub use storage::{OrderStorage, StorageError};
pub use sync::{SyncRequest, SyncResponse};

// Re-export shared types for convenience
pub use shared::order::{Order, OrderEvent, OrderEventType, OrderStatus, QueueKind};
