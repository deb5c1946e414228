//! Queue API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::order::{QueueKind, QueueSnapshot};

use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenQuery {
    /// Overrides `INCLUDE_PREPARING_IN_KITCHEN`
    pub include_preparing: Option<bool>,
}

/// GET /api/queues/kitchen
pub async fn kitchen(
    State(state): State<ServerState>,
    Query(query): Query<KitchenQuery>,
) -> AppResult<Json<QueueSnapshot>> {
    let include_preparing = query
        .include_preparing
        .unwrap_or(state.config.include_preparing_in_kitchen);
    let kind = QueueKind::Kitchen { include_preparing };
    Ok(Json(state.orders.queue_snapshot(&kind)?))
}

/// GET /api/queues/waiter
pub async fn waiter(State(state): State<ServerState>) -> AppResult<Json<QueueSnapshot>> {
    Ok(Json(state.orders.queue_snapshot(&QueueKind::Waiter)?))
}

/// GET /api/queues/checkout
pub async fn checkout(State(state): State<ServerState>) -> AppResult<Json<QueueSnapshot>> {
    Ok(Json(state.orders.queue_snapshot(&QueueKind::Checkout)?))
}

/// GET /api/queues/tables/{table_id}
pub async fn table(
    State(state): State<ServerState>,
    Path(table_id): Path<String>,
) -> AppResult<Json<QueueSnapshot>> {
    let kind = QueueKind::Customer { table_id };
    Ok(Json(state.orders.queue_snapshot(&kind)?))
}
