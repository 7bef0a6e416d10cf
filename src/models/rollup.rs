use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate value and gain/loss of every priced holding carrying one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRollUp {
    pub tag: String,
    pub holdings: usize,
    pub total_quantity: BigDecimal,
    pub total_value: BigDecimal,
    pub gain_loss: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollUpTotal {
    pub market_value: BigDecimal,
    pub gain_loss: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollUpReport {
    /// Sorted by tag name.
    pub tags: Vec<TagRollUp>,
    pub total: RollUpTotal,
    /// Symbols with no price at all; their holdings are left out of every aggregate.
    pub missing: Vec<String>,
    /// Symbols valued from a last-known quote after a failed fetch.
    pub stale: Vec<String>,
    pub unpriced: bool,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_market_value: BigDecimal,
    pub total_unrealized_gain_loss: BigDecimal,
    pub missing: Vec<String>,
    pub stale: Vec<String>,
    pub unpriced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub market_value: BigDecimal,
    pub unrealized_gain_loss: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagTimeseries {
    pub tags: BTreeMap<String, Vec<SeriesPoint>>,
    pub total: Vec<SeriesPoint>,
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesParams {
    pub days: Option<u32>,
}
