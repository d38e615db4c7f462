//! Instant broadcast handler

use axum::{extract::State, http::StatusCode, Json};
use herald_core::QuickBroadcast;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{dispatch_error, ApiError};
use crate::state::AppState;

/// Broadcast accepted response
#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub message: String,
    pub campaign_id: Uuid,
    pub status: String,
    pub total_contacts: i32,
    pub total_groups: i32,
    pub workers: usize,
}

/// Send a one-off message right away
///
/// POST /api/v1/broadcast/instant
pub async fn instant_broadcast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuickBroadcast>,
) -> Result<(StatusCode, Json<BroadcastResponse>), ApiError> {
    let (campaign, dispatch) = state
        .manager
        .quick_broadcast(request)
        .await
        .map_err(dispatch_error)?;

    info!(campaign_id = %campaign.id, "Instant broadcast started");

    Ok((
        StatusCode::ACCEPTED,
        Json(BroadcastResponse {
            message: "Broadcast started".to_string(),
            campaign_id: campaign.id,
            status: campaign.status,
            total_contacts: dispatch.total_contacts,
            total_groups: dispatch.total_groups,
            workers: dispatch.workers_launched,
        }),
    ))
}
