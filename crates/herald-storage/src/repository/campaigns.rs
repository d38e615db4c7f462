//! Campaign repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::types::CampaignId;
use herald_common::Result;
use uuid::Uuid;

use crate::db::{db_err, DatabasePool};
use crate::models::{
    Campaign, CampaignSettings, CampaignStatus, CreateCampaign, Group, Property,
};

/// Campaign repository trait
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Create a campaign with its settings, properties and target groups
    async fn create(&self, input: CreateCampaign) -> Result<Campaign>;
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;
    async fn list(
        &self,
        status: Option<CampaignStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Campaign>>;
    async fn settings(&self, id: CampaignId) -> Result<Option<CampaignSettings>>;
    async fn properties(&self, id: CampaignId) -> Result<Vec<Property>>;
    /// Explicitly selected target groups
    async fn target_groups(&self, id: CampaignId) -> Result<Vec<Group>>;
    /// Live status read, used for cooperative cancellation
    async fn status(&self, id: CampaignId) -> Result<Option<CampaignStatus>>;
    /// Claim a new run: move to RUNNING, stamp `started_at`, clear
    /// `completed_at` and snapshot the run's target totals in one write.
    /// Returns false when the campaign is missing or already RUNNING.
    async fn mark_running(
        &self,
        id: CampaignId,
        at: DateTime<Utc>,
        total_contacts: i32,
        total_groups: i32,
    ) -> Result<bool>;
    async fn update_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>>;
    /// Atomically move RUNNING -> COMPLETED. Returns false when the
    /// campaign was not RUNNING.
    async fn complete_if_running(&self, id: CampaignId, at: DateTime<Utc>) -> Result<bool>;
}

/// Database campaign repository
#[derive(Clone)]
pub struct DbCampaignRepository {
    pool: DatabasePool,
}

impl DbCampaignRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for DbCampaignRepository {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let id = Uuid::now_v7();
        let mut tx = self.pool.pool().begin().await.map_err(db_err)?;

        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                id, name, status, send_to_all_contacts, target_tags, send_to_all_groups,
                send_to_whatsapp, post_to_facebook, post_to_instagram
            )
            VALUES ($1, $2, 'DRAFT', $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.send_to_all_contacts)
        .bind(&input.target_tags)
        .bind(input.send_to_all_groups)
        .bind(input.send_to_whatsapp)
        .bind(input.post_to_facebook)
        .bind(input.post_to_instagram)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let s = &input.settings;
        sqlx::query(
            r#"
            INSERT INTO campaign_settings (
                campaign_id, delay_min, delay_max, warmup_mode, pause_every_x_messages,
                pause_duration_seconds, max_messages_per_hour
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(s.delay_min)
        .bind(s.delay_max)
        .bind(s.warmup_mode)
        .bind(s.pause_every_x_messages)
        .bind(s.pause_duration_seconds)
        .bind(s.max_messages_per_hour)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for property_id in &input.property_ids {
            sqlx::query(
                "INSERT INTO campaign_properties (campaign_id, property_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(property_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for group_id in &input.target_group_ids {
            sqlx::query(
                "INSERT INTO campaign_target_groups (campaign_id, group_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(group_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(campaign)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_err)
    }

    async fn list(
        &self,
        status: Option<CampaignStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Campaign>> {
        if let Some(status) = status {
            sqlx::query_as::<_, Campaign>(
                r#"
                SELECT * FROM campaigns
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.pool())
            .await
            .map_err(db_err)
        } else {
            sqlx::query_as::<_, Campaign>(
                r#"
                SELECT * FROM campaigns
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.pool())
            .await
            .map_err(db_err)
        }
    }

    async fn settings(&self, id: CampaignId) -> Result<Option<CampaignSettings>> {
        sqlx::query_as::<_, CampaignSettings>(
            "SELECT * FROM campaign_settings WHERE campaign_id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn properties(&self, id: CampaignId) -> Result<Vec<Property>> {
        sqlx::query_as::<_, Property>(
            r#"
            SELECT p.* FROM properties p
            JOIN campaign_properties cp ON cp.property_id = p.id
            WHERE cp.campaign_id = $1
            ORDER BY p.created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn target_groups(&self, id: CampaignId) -> Result<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT g.* FROM channel_groups g
            JOIN campaign_target_groups ctg ON ctg.group_id = g.id
            WHERE ctg.campaign_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn status(&self, id: CampaignId) -> Result<Option<CampaignStatus>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_err)?;

        Ok(row.and_then(|(status,)| status.parse().ok()))
    }

    async fn mark_running(
        &self,
        id: CampaignId,
        at: DateTime<Utc>,
        total_contacts: i32,
        total_groups: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                status = 'RUNNING',
                started_at = $2,
                completed_at = NULL,
                total_contacts = $3,
                total_groups = $4,
                updated_at = NOW()
            WHERE id = $1 AND status <> 'RUNNING'
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(total_contacts)
        .bind(total_groups)
        .execute(self.pool.pool())
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>> {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                status = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn complete_if_running(&self, id: CampaignId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                status = 'COMPLETED',
                completed_at = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'RUNNING'
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool.pool())
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}
