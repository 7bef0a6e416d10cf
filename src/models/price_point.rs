use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// One daily close for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}
