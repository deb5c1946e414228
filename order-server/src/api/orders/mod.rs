//! Order API
//!
//! Every mutation goes through `OrdersManager`; each one is a conditional
//! update and answers 409 when the order is not in the expected status.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/start-preparing", post(handler::start_preparing))
        .route("/{id}/kitchen-complete", post(handler::kitchen_complete))
        .route("/{id}/deliver", post(handler::deliver))
        .route("/{id}/settle", post(handler::settle))
        .route("/{id}/decline", post(handler::decline))
}
