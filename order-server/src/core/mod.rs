//! Core - configuration, state, server and background tasks
//!
//! - [`Config`] - server configuration
//! - [`ServerState`] - shared service handles
//! - [`Server`] - HTTP server + TCP subscriber listener
//! - [`ServerError`] - startup errors
//! - [`EventRouter`] - manager events onto the bus

pub mod config;
pub mod error;
pub mod event_router;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{Result, ServerError};
pub use event_router::EventRouter;
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
