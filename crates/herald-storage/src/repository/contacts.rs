//! Contact repository

use async_trait::async_trait;
use herald_common::Result;

use crate::db::{db_err, DatabasePool};
use crate::models::Contact;

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Every ACTIVE contact
    async fn list_active(&self) -> Result<Vec<Contact>>;
    /// ACTIVE contacts carrying at least one of `tags` (exact, case-sensitive)
    async fn list_active_with_any_tag(&self, tags: &[String]) -> Result<Vec<Contact>>;
}

/// Database contact repository
#[derive(Clone)]
pub struct DbContactRepository {
    pool: DatabasePool,
}

impl DbContactRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for DbContactRepository {
    async fn list_active(&self) -> Result<Vec<Contact>> {
        sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE status = 'ACTIVE' ORDER BY imported_at ASC, id ASC",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn list_active_with_any_tag(&self, tags: &[String]) -> Result<Vec<Contact>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE status = 'ACTIVE' AND tags && $1
            ORDER BY imported_at ASC, id ASC
            "#,
        )
        .bind(tags)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }
}
