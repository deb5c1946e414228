//! Checkout API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::order::{Bill, BillQuote, SettleBillRequest, SettlementReceipt};

use crate::core::ServerState;
use crate::orders::CheckoutError;
use crate::utils::AppResult;

/// GET /api/checkout/bills
pub async fn list_bills(State(state): State<ServerState>) -> AppResult<Json<Vec<Bill>>> {
    Ok(Json(state.checkout.list_bills()?))
}

/// GET /api/checkout/bills/{table_id}
pub async fn get_bill(
    State(state): State<ServerState>,
    Path(table_id): Path<String>,
) -> AppResult<Json<Bill>> {
    let bill = state
        .checkout
        .get_bill(&table_id)?
        .ok_or(CheckoutError::BillNotFound(table_id))?;
    Ok(Json(bill))
}

/// POST /api/checkout/bills/{table_id}/quote
pub async fn quote(
    State(state): State<ServerState>,
    Path(table_id): Path<String>,
    Json(request): Json<SettleBillRequest>,
) -> AppResult<Json<BillQuote>> {
    Ok(Json(state.checkout.quote(&table_id, &request)?))
}

/// POST /api/checkout/bills/{table_id}/settle
///
/// 409 with `failed_order_ids` / `settled_order_ids` when only part of the
/// bill could be settled; the unsettled orders stay on the bill.
pub async fn settle(
    State(state): State<ServerState>,
    Path(table_id): Path<String>,
    Json(request): Json<SettleBillRequest>,
) -> AppResult<Json<SettlementReceipt>> {
    Ok(Json(state.checkout.settle_bill(&table_id, &request).await?))
}
