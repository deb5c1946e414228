//! Checkout API
//!
//! Bills are recomputed on every request from the table's payment-ready
//! orders; nothing about a bill is stored.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/bills", get(handler::list_bills))
        .route("/bills/{table_id}", get(handler::get_bill))
        .route("/bills/{table_id}/quote", post(handler::quote))
        .route("/bills/{table_id}/settle", post(handler::settle))
}
