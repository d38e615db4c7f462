//! Sending identity repository

use async_trait::async_trait;
use herald_common::types::IdentityId;
use herald_common::Result;

use crate::db::{db_err, DatabasePool};
use crate::models::{IdentityStatus, SendingIdentity};

/// Sending identity repository trait
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn get(&self, id: IdentityId) -> Result<Option<SendingIdentity>>;
    async fn list(&self) -> Result<Vec<SendingIdentity>>;
    /// Identities in the given status, oldest first so the ordering is stable
    async fn list_by_status(&self, status: IdentityStatus) -> Result<Vec<SendingIdentity>>;
    /// Persist one confirmed send on both counters
    async fn record_sent(&self, id: IdentityId) -> Result<()>;
    /// Zero every identity's `sent_today`; returns the number of rows touched
    async fn reset_sent_today(&self) -> Result<u64>;
}

/// Database sending identity repository
#[derive(Clone)]
pub struct DbIdentityRepository {
    pool: DatabasePool,
}

impl DbIdentityRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for DbIdentityRepository {
    async fn get(&self, id: IdentityId) -> Result<Option<SendingIdentity>> {
        sqlx::query_as::<_, SendingIdentity>("SELECT * FROM sending_identities WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_err)
    }

    async fn list(&self) -> Result<Vec<SendingIdentity>> {
        sqlx::query_as::<_, SendingIdentity>(
            "SELECT * FROM sending_identities ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn list_by_status(&self, status: IdentityStatus) -> Result<Vec<SendingIdentity>> {
        sqlx::query_as::<_, SendingIdentity>(
            "SELECT * FROM sending_identities WHERE status = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(status.to_string())
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn record_sent(&self, id: IdentityId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sending_identities SET
                total_sent = total_sent + 1,
                sent_today = sent_today + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(self.pool.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn reset_sent_today(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sending_identities SET sent_today = 0, updated_at = NOW() WHERE sent_today <> 0",
        )
        .execute(self.pool.pool())
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
