//! Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::message::{NotificationCategory, NotificationPayload};
use shared::order::{StaffRole, Topic};

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallWaiterRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallWaiterResponse {
    pub table_id: String,
    /// Waiter subscribers that received the call
    pub delivered: usize,
}

/// POST /api/tables/{table_id}/call-waiter
///
/// Only notifies the waiter topic. Orders are not touched, and a call with
/// no waiter listening is not an error.
pub async fn call_waiter(
    State(state): State<ServerState>,
    Path(table_id): Path<String>,
    body: Option<Json<CallWaiterRequest>>,
) -> AppResult<Json<CallWaiterResponse>> {
    if table_id.trim().is_empty() {
        return Err(AppError::validation("tableId is required"));
    }
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let payload = NotificationPayload::info(
        format!("Table {}", table_id),
        request
            .message
            .unwrap_or_else(|| "Waiter requested".to_string()),
    )
    .with_category(NotificationCategory::WaiterCall)
    .with_data(serde_json::json!({ "tableId": table_id }));

    let delivered = state.notify(&Topic::Role(StaffRole::Waiter), &payload);
    tracing::info!(table_id = %table_id, delivered, "Waiter called");

    Ok(Json(CallWaiterResponse { table_id, delivered }))
}
