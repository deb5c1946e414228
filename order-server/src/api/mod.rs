//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - liveness
//! - [`orders`] - create, read and transition orders
//! - [`queues`] - role queue snapshots
//! - [`checkout`] - per-table bills, quotes and settlement
//! - [`tables`] - waiter calls
//! - [`sync`] - reconnect reconciliation

pub mod checkout;
pub mod health;
pub mod orders;
pub mod queues;
pub mod sync;
pub mod tables;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppError, AppResult};

/// Build the router without state
pub fn routes() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(queues::router())
        .merge(checkout::router())
        .merge(tables::router())
        .merge(sync::router())
}

/// Build the full application
pub fn build_app(state: ServerState) -> Router {
    routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
