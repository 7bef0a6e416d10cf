use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{holding_queries, tag_queries, PortfolioStore};
use crate::errors::AppError;
use crate::models::{Holding, HoldingRecord, Tag};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("✅ Database connected and migrations applied");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PortfolioStore for PgStore {
    async fn create_tag(&self, name: &str) -> Result<Tag, AppError> {
        Ok(tag_queries::insert(&self.pool, Tag::new(name.to_string())).await?)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        Ok(tag_queries::fetch_all(&self.pool).await?)
    }

    async fn fetch_tag(&self, id: Uuid) -> Result<Option<Tag>, AppError> {
        Ok(tag_queries::fetch_one(&self.pool, id).await?)
    }

    async fn rename_tag(&self, id: Uuid, name: &str) -> Result<Option<Tag>, AppError> {
        Ok(tag_queries::rename(&self.pool, id, name).await?)
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(tag_queries::delete(&self.pool, id).await? > 0)
    }

    async fn create_holding(&self, record: &HoldingRecord) -> Result<Holding, AppError> {
        let id = holding_queries::insert(&self.pool, record).await?;
        holding_queries::fetch_one(&self.pool, id)
            .await?
            .ok_or_else(|| {
                error!("Holding {} vanished right after insert", id);
                AppError::NotFound(format!("Holding {} not found", id))
            })
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>, AppError> {
        Ok(holding_queries::fetch_all(&self.pool).await?)
    }

    async fn fetch_holding(&self, id: Uuid) -> Result<Option<Holding>, AppError> {
        Ok(holding_queries::fetch_one(&self.pool, id).await?)
    }

    async fn update_holding(&self, id: Uuid, record: &HoldingRecord) -> Result<Option<Holding>, AppError> {
        if !holding_queries::update(&self.pool, id, record).await? {
            return Ok(None);
        }
        Ok(holding_queries::fetch_one(&self.pool, id).await?)
    }

    async fn delete_holding(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(holding_queries::delete(&self.pool, id).await? > 0)
    }
}
