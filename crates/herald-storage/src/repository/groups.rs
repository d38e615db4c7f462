//! Channel group repository

use async_trait::async_trait;
use herald_common::types::IdentityId;
use herald_common::Result;

use crate::db::{db_err, DatabasePool};
use crate::models::Group;

/// Channel group repository trait
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Every group owned by the identity
    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<Group>>;
}

/// Database channel group repository
#[derive(Clone)]
pub struct DbGroupRepository {
    pool: DatabasePool,
}

impl DbGroupRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for DbGroupRepository {
    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            "SELECT * FROM channel_groups WHERE identity_id = $1 ORDER BY name ASC",
        )
        .bind(identity_id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }
}
