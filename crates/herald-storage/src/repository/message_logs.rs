//! Message log repository
//!
//! The message log is append-only: there is deliberately no update or
//! delete operation here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::types::CampaignId;
use herald_common::Result;
use uuid::Uuid;

use crate::db::{db_err, DatabasePool};
use crate::models::{MessageLog, MessageLogFilter, MessageStatusCounts, NewMessageLog, Platform};

/// Message log repository trait
#[async_trait]
pub trait MessageLogRepository: Send + Sync {
    async fn append(&self, entry: NewMessageLog) -> Result<MessageLog>;
    /// Attempts recorded for the campaign on one platform, any status.
    /// `since` limits the count to entries written at or after a run start.
    async fn count_for_campaign(
        &self,
        campaign_id: CampaignId,
        platform: Platform,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64>;
    async fn status_counts(
        &self,
        campaign_id: CampaignId,
        platform: Platform,
        since: Option<DateTime<Utc>>,
    ) -> Result<MessageStatusCounts>;
    /// Newest first
    async fn list(&self, filter: MessageLogFilter) -> Result<Vec<MessageLog>>;
}

/// Database message log repository
#[derive(Clone)]
pub struct DbMessageLogRepository {
    pool: DatabasePool,
}

impl DbMessageLogRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageLogRepository for DbMessageLogRepository {
    async fn append(&self, entry: NewMessageLog) -> Result<MessageLog> {
        sqlx::query_as::<_, MessageLog>(
            r#"
            INSERT INTO message_logs (
                id, campaign_id, identity_id, contact_id, group_id, property_id,
                message_text, status, error_message, platform, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(entry.campaign_id)
        .bind(entry.identity_id)
        .bind(entry.contact_id)
        .bind(entry.group_id)
        .bind(entry.property_id)
        .bind(&entry.message_text)
        .bind(entry.status.to_string())
        .bind(&entry.error_message)
        .bind(entry.platform.to_string())
        // same clock as `campaigns.started_at`, which run-scoped counts compare against
        .bind(Utc::now())
        .fetch_one(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn count_for_campaign(
        &self,
        campaign_id: CampaignId,
        platform: Platform,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM message_logs
            WHERE campaign_id = $1 AND platform = $2
              AND ($3::timestamptz IS NULL OR sent_at >= $3)
            "#,
        )
        .bind(campaign_id)
        .bind(platform.to_string())
        .bind(since)
        .fetch_one(self.pool.pool())
        .await
        .map_err(db_err)?;
        Ok(count.0)
    }

    async fn status_counts(
        &self,
        campaign_id: CampaignId,
        platform: Platform,
        since: Option<DateTime<Utc>>,
    ) -> Result<MessageStatusCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM message_logs
            WHERE campaign_id = $1 AND platform = $2
              AND ($3::timestamptz IS NULL OR sent_at >= $3)
            GROUP BY status
            "#,
        )
        .bind(campaign_id)
        .bind(platform.to_string())
        .bind(since)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)?;

        let mut counts = MessageStatusCounts::default();
        for (status, count) in rows {
            counts.add(&status, count);
        }
        Ok(counts)
    }

    async fn list(&self, filter: MessageLogFilter) -> Result<Vec<MessageLog>> {
        sqlx::query_as::<_, MessageLog>(
            r#"
            SELECT * FROM message_logs
            WHERE ($1::uuid IS NULL OR campaign_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR platform = $3)
            ORDER BY sent_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.campaign_id)
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.platform.map(|p| p.to_string()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }
}
