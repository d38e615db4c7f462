//! Sending identity handlers

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use herald_storage::models::SendingIdentity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{dispatch_error, ApiError};
use crate::state::AppState;

/// Identity response
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub name: String,
    pub session_name: String,
    pub is_primary: bool,
    pub status: String,
    pub total_sent: i64,
    pub sent_today: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<SendingIdentity> for IdentityResponse {
    fn from(i: SendingIdentity) -> Self {
        Self {
            id: i.id,
            name: i.name,
            session_name: i.session_name,
            is_primary: i.is_primary,
            status: i.status,
            total_sent: i.total_sent,
            sent_today: i.sent_today,
            updated_at: i.updated_at,
        }
    }
}

/// List sending identities with their counters
///
/// GET /api/v1/identities
pub async fn list_identities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IdentityResponse>>, ApiError> {
    let identities = state
        .manager
        .list_identities()
        .await
        .map_err(dispatch_error)?;

    Ok(Json(identities.into_iter().map(IdentityResponse::from).collect()))
}
