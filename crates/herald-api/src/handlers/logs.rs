//! Message log handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use herald_storage::models::{MessageLog, MessageLogFilter, MessageStatus, Platform};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{api_error, dispatch_error, ApiError};
use crate::state::AppState;

/// Query parameters for listing message logs
#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    pub campaign_id: Option<Uuid>,
    pub status: Option<String>,
    pub platform: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Message log list response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogListResponse {
    pub data: Vec<MessageLog>,
    pub limit: i64,
    pub offset: i64,
}

/// List audit entries, newest first
///
/// GET /api/v1/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLogsQuery>,
) -> Result<Json<LogListResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| s.to_uppercase().parse::<MessageStatus>())
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "validation_error", e))?;
    let platform = query
        .platform
        .as_deref()
        .map(|p| p.to_uppercase().parse::<Platform>())
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "validation_error", e))?;

    let logs = state
        .manager
        .list_logs(MessageLogFilter {
            campaign_id: query.campaign_id,
            status,
            platform,
            limit: query.limit,
            offset: query.offset,
        })
        .await
        .map_err(dispatch_error)?;

    Ok(Json(LogListResponse {
        data: logs,
        limit: query.limit,
        offset: query.offset,
    }))
}
