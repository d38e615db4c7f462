//! Repository bundle handed to the dispatch engine

use std::sync::Arc;

use crate::db::DatabasePool;
use crate::memory::MemoryStore;
use crate::repository::{
    CampaignRepository, ContactRepository, DbCampaignRepository, DbContactRepository,
    DbGroupRepository, DbIdentityRepository, DbMessageLogRepository, DbPropertyRepository,
    GroupRepository, IdentityRepository, MessageLogRepository, PropertyRepository,
};

/// Every repository the dispatch engine reads or writes
#[derive(Clone)]
pub struct Store {
    pub campaigns: Arc<dyn CampaignRepository>,
    pub identities: Arc<dyn IdentityRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub message_logs: Arc<dyn MessageLogRepository>,
}

impl Store {
    /// PostgreSQL-backed store
    pub fn postgres(pool: DatabasePool) -> Self {
        Self {
            campaigns: Arc::new(DbCampaignRepository::new(pool.clone())),
            identities: Arc::new(DbIdentityRepository::new(pool.clone())),
            contacts: Arc::new(DbContactRepository::new(pool.clone())),
            groups: Arc::new(DbGroupRepository::new(pool.clone())),
            properties: Arc::new(DbPropertyRepository::new(pool.clone())),
            message_logs: Arc::new(DbMessageLogRepository::new(pool)),
        }
    }

    /// Store backed by a shared in-process state
    pub fn memory(memory: Arc<MemoryStore>) -> Self {
        Self {
            campaigns: memory.clone(),
            identities: memory.clone(),
            contacts: memory.clone(),
            groups: memory.clone(),
            properties: memory.clone(),
            message_logs: memory,
        }
    }
}
