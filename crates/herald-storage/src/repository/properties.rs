//! Property repository

use async_trait::async_trait;
use chrono::Utc;
use herald_common::types::PropertyId;
use herald_common::Result;
use uuid::Uuid;

use crate::db::{db_err, DatabasePool};
use crate::models::{CreateProperty, Property};

/// Property repository trait
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn create(&self, input: CreateProperty) -> Result<Property>;
    async fn get(&self, id: PropertyId) -> Result<Option<Property>>;
}

/// Database property repository
#[derive(Clone)]
pub struct DbPropertyRepository {
    pool: DatabasePool,
}

impl DbPropertyRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRepository for DbPropertyRepository {
    async fn create(&self, input: CreateProperty) -> Result<Property> {
        let now = Utc::now();
        sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (id, title, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.title)
        .bind(&input.content)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await
        .map_err(db_err)
    }

    async fn get(&self, id: PropertyId) -> Result<Option<Property>> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(db_err)
    }
}
