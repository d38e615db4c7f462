//! Shared handler state

use herald_core::CampaignManager;
use herald_storage::DatabasePool;

/// Application state shared across handlers
pub struct AppState {
    pub manager: CampaignManager,
    /// Absent when the server runs on the in-memory store
    pub db_pool: Option<DatabasePool>,
}

impl AppState {
    pub fn new(manager: CampaignManager, db_pool: Option<DatabasePool>) -> Self {
        Self { manager, db_pool }
    }
}
