//! Sync API Handlers

use axum::{
    Json,
    extract::{Query, State},
};

use crate::core::ServerState;
use crate::orders::{SyncRequest, SyncResponse};
use crate::utils::AppResult;

/// GET /api/sync?sinceSequence=&epoch=
///
/// Clients call this on reconnect. Without both parameters matching the
/// server's current state, every open order is returned. The response
/// also carries `RECONCILE_INTERVAL_SECS` so followers poll at the rate
/// this server was configured for.
pub async fn sync(
    State(state): State<ServerState>,
    Query(request): Query<SyncRequest>,
) -> AppResult<Json<SyncResponse>> {
    let mut response = state.orders.sync(&request)?;
    response.poll_interval_secs = Some(state.config.reconcile_interval().as_secs());
    Ok(Json(response))
}
