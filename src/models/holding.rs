use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::PriceSource;

// A single portfolio position, with its tag references resolved to names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Holding {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: BigDecimal,
    pub cost_basis: BigDecimal,
    pub tags: Vec<String>,
    pub closed: bool,
    /// Per-unit price the position was sold at. Only set on closed holdings.
    pub closing_price: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for both create and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHolding {
    pub symbol: String,
    pub quantity: BigDecimal,
    pub cost_basis: BigDecimal,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub closing_price: Option<BigDecimal>,
}

pub type UpdateHolding = CreateHolding;

/// Validated, normalized holding fields as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRecord {
    pub symbol: String,
    pub quantity: BigDecimal,
    pub cost_basis: BigDecimal,
    pub tags: Vec<String>,
    pub closed: bool,
    pub closing_price: Option<BigDecimal>,
}

/// A holding enriched with its current price, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingView {
    #[serde(flatten)]
    pub holding: Holding,
    pub long_name: Option<String>,
    pub current_price: Option<BigDecimal>,
    pub market_value: Option<BigDecimal>,
    pub unrealized_gain_loss: Option<BigDecimal>,
    pub price_status: PriceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    Live,
    Stale,
    Missing,
    /// Valued at its closing price, not the market.
    Closed,
}

impl From<Option<PriceSource>> for PriceStatus {
    fn from(source: Option<PriceSource>) -> Self {
        match source {
            Some(PriceSource::Live) => PriceStatus::Live,
            Some(PriceSource::LastKnown) => PriceStatus::Stale,
            None => PriceStatus::Missing,
        }
    }
}
