use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::PortfolioStore;
use crate::errors::AppError;
use crate::models::{Holding, HoldingRecord, Tag};

#[derive(Debug, Clone)]
struct StoredHolding {
    id: Uuid,
    symbol: String,
    quantity: BigDecimal,
    cost_basis: BigDecimal,
    tag_ids: Vec<Uuid>,
    closed: bool,
    closing_price: Option<BigDecimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    // Insertion order, to break created_at ties.
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    tags: HashMap<Uuid, Tag>,
    holdings: HashMap<Uuid, StoredHolding>,
    next_seq: u64,
}

impl Inner {
    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.tags
            .values()
            .any(|t| t.name == name && Some(t.id) != except)
    }

    fn upsert_tag(&mut self, name: &str) -> Uuid {
        if let Some(tag) = self.tags.values().find(|t| t.name == name) {
            return tag.id;
        }
        let tag = Tag::new(name.to_string());
        let id = tag.id;
        self.tags.insert(id, tag);
        id
    }

    fn tag_ids_for(&mut self, names: &[String]) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = names.iter().map(|n| self.upsert_tag(n)).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn resolve(&self, stored: &StoredHolding) -> Holding {
        let mut tags: Vec<String> = stored
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id).map(|t| t.name.clone()))
            .collect();
        tags.sort();

        Holding {
            id: stored.id,
            symbol: stored.symbol.clone(),
            quantity: stored.quantity.clone(),
            cost_basis: stored.cost_basis.clone(),
            tags,
            closed: stored.closed,
            closing_price: stored.closing_price.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

/// Process-local store used when no database is configured, and in tests.
/// Everything is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn create_tag(&self, name: &str) -> Result<Tag, AppError> {
        let mut inner = self.inner.write();
        if inner.name_taken(name, None) {
            return Err(AppError::Conflict("Tag already exists".into()));
        }
        let tag = Tag::new(name.to_string());
        inner.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let mut tags: Vec<Tag> = self.inner.read().tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn fetch_tag(&self, id: Uuid) -> Result<Option<Tag>, AppError> {
        Ok(self.inner.read().tags.get(&id).cloned())
    }

    async fn rename_tag(&self, id: Uuid, name: &str) -> Result<Option<Tag>, AppError> {
        let mut inner = self.inner.write();
        if !inner.tags.contains_key(&id) {
            return Ok(None);
        }
        if inner.name_taken(name, Some(id)) {
            return Err(AppError::Conflict("Tag already exists".into()));
        }
        let tag = inner.tags.get_mut(&id).map(|tag| {
            tag.name = name.to_string();
            tag.updated_at = Utc::now();
            tag.clone()
        });
        Ok(tag)
    }

    async fn delete_tag(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.inner.write();
        if inner.tags.remove(&id).is_none() {
            return Ok(false);
        }
        for holding in inner.holdings.values_mut() {
            holding.tag_ids.retain(|t| *t != id);
        }
        Ok(true)
    }

    async fn create_holding(&self, record: &HoldingRecord) -> Result<Holding, AppError> {
        let mut inner = self.inner.write();
        let tag_ids = inner.tag_ids_for(&record.tags);
        let now = Utc::now();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let stored = StoredHolding {
            id: Uuid::new_v4(),
            symbol: record.symbol.clone(),
            quantity: record.quantity.clone(),
            cost_basis: record.cost_basis.clone(),
            tag_ids,
            closed: record.closed,
            closing_price: record.closing_price.clone(),
            created_at: now,
            updated_at: now,
            seq,
        };
        let holding = inner.resolve(&stored);
        inner.holdings.insert(stored.id, stored);
        Ok(holding)
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>, AppError> {
        let inner = self.inner.read();
        let mut stored: Vec<&StoredHolding> = inner.holdings.values().collect();
        stored.sort_by_key(|h| (h.created_at, h.seq));
        Ok(stored.into_iter().map(|h| inner.resolve(h)).collect())
    }

    async fn fetch_holding(&self, id: Uuid) -> Result<Option<Holding>, AppError> {
        let inner = self.inner.read();
        Ok(inner.holdings.get(&id).map(|h| inner.resolve(h)))
    }

    async fn update_holding(&self, id: Uuid, record: &HoldingRecord) -> Result<Option<Holding>, AppError> {
        let mut inner = self.inner.write();
        if !inner.holdings.contains_key(&id) {
            return Ok(None);
        }
        let tag_ids = inner.tag_ids_for(&record.tags);

        let Some(stored) = inner.holdings.get_mut(&id) else { return Ok(None) };
        stored.symbol = record.symbol.clone();
        stored.quantity = record.quantity.clone();
        stored.cost_basis = record.cost_basis.clone();
        stored.tag_ids = tag_ids;
        stored.closed = record.closed;
        stored.closing_price = record.closing_price.clone();
        stored.updated_at = Utc::now();

        let stored = stored.clone();
        Ok(Some(inner.resolve(&stored)))
    }

    async fn delete_holding(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.inner.write().holdings.remove(&id).is_some())
    }
}
