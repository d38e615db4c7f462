//! API request handlers

pub mod broadcast;
pub mod campaigns;
pub mod health;
pub mod identities;
pub mod logs;

use axum::{http::StatusCode, Json};
use herald_core::DispatchError;
use serde::{Deserialize, Serialize};
use tracing::error;

pub use health::*;

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler error: status plus JSON body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Map an engine error onto an HTTP response
pub(crate) fn dispatch_error(e: DispatchError) -> ApiError {
    match e {
        DispatchError::NotFound => {
            api_error(StatusCode::NOT_FOUND, "not_found", "Campaign not found")
        }
        DispatchError::AlreadyRunning => api_error(
            StatusCode::BAD_REQUEST,
            "already_running",
            "Campaign is already running",
        ),
        DispatchError::NoEligibleIdentities | DispatchError::NoPayload => api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &e.code().to_lowercase(),
            e.to_string(),
        ),
        DispatchError::Validation(message) => {
            api_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DispatchError::Storage(inner) => {
            let status = StatusCode::from_u16(inner.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!("Storage error: {}", inner);
                api_error(status, "internal_error", "Internal server error")
            } else {
                api_error(status, &inner.code().to_lowercase(), inner.to_string())
            }
        }
    }
}
