//! Campaign handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use herald_storage::models::{
    Campaign, CampaignSettingsInput, CampaignStats, CampaignStatus, CreateCampaign,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{api_error, dispatch_error, ApiError};
use crate::state::AppState;

/// Query parameters for listing campaigns
#[derive(Debug, Deserialize)]
pub struct ListCampaignsQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

fn default_true() -> bool {
    true
}

/// Campaign list response
#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignListResponse {
    pub data: Vec<CampaignResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// Campaign response
#[derive(Debug, Serialize, Deserialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub send_to_all_contacts: bool,
    pub target_tags: Vec<String>,
    pub send_to_all_groups: bool,
    pub send_to_whatsapp: bool,
    pub post_to_facebook: bool,
    pub post_to_instagram: bool,
    pub total_contacts: i32,
    pub total_groups: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            name: c.name,
            status: c.status,
            send_to_all_contacts: c.send_to_all_contacts,
            target_tags: c.target_tags,
            send_to_all_groups: c.send_to_all_groups,
            send_to_whatsapp: c.send_to_whatsapp,
            post_to_facebook: c.post_to_facebook,
            post_to_instagram: c.post_to_instagram,
            total_contacts: c.total_contacts,
            total_groups: c.total_groups,
            started_at: c.started_at,
            completed_at: c.completed_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for creating a campaign
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub property_ids: Vec<Uuid>,
    #[serde(default = "default_true")]
    pub send_to_all_contacts: bool,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default)]
    pub send_to_all_groups: bool,
    #[serde(default)]
    pub target_group_ids: Vec<Uuid>,
    #[serde(default = "default_true")]
    pub send_to_whatsapp: bool,
    #[serde(default)]
    pub post_to_facebook: bool,
    #[serde(default)]
    pub post_to_instagram: bool,
    #[serde(default)]
    pub settings: CampaignSettingsInput,
}

impl From<CreateCampaignRequest> for CreateCampaign {
    fn from(r: CreateCampaignRequest) -> Self {
        Self {
            name: r.name,
            property_ids: r.property_ids,
            send_to_all_contacts: r.send_to_all_contacts,
            target_tags: r.target_tags,
            send_to_all_groups: r.send_to_all_groups,
            target_group_ids: r.target_group_ids,
            send_to_whatsapp: r.send_to_whatsapp,
            post_to_facebook: r.post_to_facebook,
            post_to_instagram: r.post_to_instagram,
            settings: r.settings,
        }
    }
}

/// Response to a start request
#[derive(Debug, Serialize, Deserialize)]
pub struct StartCampaignResponse {
    pub message: String,
    pub campaign_id: Uuid,
    pub total_contacts: i32,
    pub total_groups: i32,
    pub workers: usize,
    pub completed_immediately: bool,
}

/// Response to a pause request
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// List campaigns
///
/// GET /api/v1/campaigns
pub async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCampaignsQuery>,
) -> Result<Json<CampaignListResponse>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(s.to_uppercase().parse::<CampaignStatus>().map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, "validation_error", e)
        })?),
        None => None,
    };

    let campaigns = state
        .manager
        .list_campaigns(status, query.limit, query.offset)
        .await
        .map_err(dispatch_error)?;

    Ok(Json(CampaignListResponse {
        data: campaigns.into_iter().map(CampaignResponse::from).collect(),
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Create a new campaign
///
/// POST /api/v1/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), ApiError> {
    let campaign = state
        .manager
        .create_campaign(input.into())
        .await
        .map_err(dispatch_error)?;

    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

/// Get a campaign by ID
///
/// GET /api/v1/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let campaign = state
        .manager
        .get_campaign(campaign_id)
        .await
        .map_err(dispatch_error)?;

    Ok(Json(CampaignResponse::from(campaign)))
}

/// Start dispatching a campaign
///
/// POST /api/v1/campaigns/:campaign_id/start
pub async fn start_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<StartCampaignResponse>, ApiError> {
    let campaign = state
        .manager
        .get_campaign(campaign_id)
        .await
        .map_err(dispatch_error)?;
    // workers keep running after the handle is dropped
    let dispatch = state
        .manager
        .start_campaign(campaign_id)
        .await
        .map_err(dispatch_error)?;

    info!(campaign_id = %campaign_id, "Campaign started via API");

    Ok(Json(StartCampaignResponse {
        message: format!("Campaign '{}' started successfully", campaign.name),
        campaign_id,
        total_contacts: dispatch.total_contacts,
        total_groups: dispatch.total_groups,
        workers: dispatch.workers_launched,
        completed_immediately: dispatch.completed_immediately,
    }))
}

/// Pause a campaign
///
/// POST /api/v1/campaigns/:campaign_id/pause
pub async fn pause_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let campaign = state
        .manager
        .pause_campaign(campaign_id)
        .await
        .map_err(dispatch_error)?;

    Ok(Json(StatusResponse {
        status: campaign.status,
        message: "Campaign paused".to_string(),
    }))
}

/// Campaign progress
///
/// GET /api/v1/campaigns/:campaign_id/stats
pub async fn get_campaign_stats(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignStats>, ApiError> {
    let stats = state
        .manager
        .campaign_stats(campaign_id)
        .await
        .map_err(dispatch_error)?;

    Ok(Json(stats))
}
