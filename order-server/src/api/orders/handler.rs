//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::order::{CreateOrderInput, CreatedOrder, Order, PaymentMethod};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// POST /api/orders
///
/// Numbering may back off and retry, so it runs on the blocking pool.
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<CreatedOrder>)> {
    let orders = state.orders.clone();
    let created = tokio::task::spawn_blocking(move || orders.create_order(input))
        .await
        .map_err(|e| AppError::internal(format!("Order creation task failed: {}", e)))??;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.get_order(&id)?))
}

/// POST /api/orders/{id}/start-preparing
pub async fn start_preparing(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.start_preparing(&id)?))
}

/// POST /api/orders/{id}/kitchen-complete
pub async fn kitchen_complete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.kitchen_complete(&id)?))
}

/// POST /api/orders/{id}/deliver
pub async fn deliver(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.deliver_to_table(&id)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub payment_method: PaymentMethod,
}

/// POST /api/orders/{id}/settle
///
/// Settling an order that is already paid answers 200 with the stored order.
pub async fn settle(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(request): Json<SettleRequest>,
) -> AppResult<Json<Order>> {
    let outcome = state.orders.settle(&id, request.payment_method)?;
    Ok(Json(outcome.order))
}

/// POST /api/orders/{id}/decline
pub async fn decline(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.decline(&id)?))
}
