//! Health check
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /health | GET | Liveness plus storage and bus summary |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    epoch: String,
    server_sequence: u64,
    open_orders: u64,
    tcp_subscribers: usize,
}

async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthResponse>> {
    let storage = state.orders.storage();
    let open_orders = storage
        .open_order_count()
        .map_err(|e| crate::utils::AppError::database(e.to_string()))?;
    let server_sequence = state.orders.current_sequence()?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        epoch: state.orders.epoch().to_string(),
        server_sequence,
        open_orders,
        tcp_subscribers: state.bus().get_connected_clients().len(),
    }))
}
