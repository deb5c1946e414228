//! Role queue API
//!
//! Each response carries `serverSequence` and `serverEpoch`, so a client can
//! tell which live events the snapshot already reflects.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/queues", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/kitchen", get(handler::kitchen))
        .route("/waiter", get(handler::waiter))
        .route("/checkout", get(handler::checkout))
        .route("/tables/{table_id}", get(handler::table))
}
