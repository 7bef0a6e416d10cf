use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Holding, HoldingRecord, Tag};

pub mod holding_queries;
pub mod memory_store;
pub mod pg_store;
pub mod tag_queries;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

/// Persistence for holdings and tags.
///
/// Holdings reference tags by id; every `Holding` handed back has those
/// references resolved to names, sorted. Tag names given in a
/// [`HoldingRecord`] are created on the fly when they don't exist yet.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Fails with [`AppError::Conflict`] if the name is taken.
    async fn create_tag(&self, name: &str) -> Result<Tag, AppError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, AppError>;
    async fn fetch_tag(&self, id: Uuid) -> Result<Option<Tag>, AppError>;
    async fn rename_tag(&self, id: Uuid, name: &str) -> Result<Option<Tag>, AppError>;
    /// Also detaches the tag from every holding. Returns false if it didn't exist.
    async fn delete_tag(&self, id: Uuid) -> Result<bool, AppError>;

    async fn create_holding(&self, record: &HoldingRecord) -> Result<Holding, AppError>;
    async fn list_holdings(&self) -> Result<Vec<Holding>, AppError>;
    async fn fetch_holding(&self, id: Uuid) -> Result<Option<Holding>, AppError>;
    async fn update_holding(&self, id: Uuid, record: &HoldingRecord) -> Result<Option<Holding>, AppError>;
    async fn delete_holding(&self, id: Uuid) -> Result<bool, AppError>;
}
