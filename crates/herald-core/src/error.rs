//! Dispatch engine errors

use thiserror::Error;

/// Errors surfaced to callers of the campaign manager and orchestrator
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Campaign not found")]
    NotFound,

    #[error("Campaign is already running")]
    AlreadyRunning,

    #[error("No connected sending identity is available")]
    NoEligibleIdentities,

    #[error("Campaign has no linked properties")]
    NoPayload,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] herald_common::Error),
}

impl DispatchError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::NotFound => "NOT_FOUND",
            DispatchError::AlreadyRunning => "ALREADY_RUNNING",
            DispatchError::NoEligibleIdentities => "NO_ELIGIBLE_IDENTITIES",
            DispatchError::NoPayload => "NO_PAYLOAD",
            DispatchError::Validation(_) => "VALIDATION_ERROR",
            DispatchError::Storage(e) => e.code(),
        }
    }
}

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
