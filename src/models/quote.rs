use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A current price for one symbol, as last fetched from the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: BigDecimal,
    pub previous_close: Option<BigDecimal>,
    pub change: Option<BigDecimal>,
    pub change_pct: Option<BigDecimal>,
    pub currency: Option<String>,
    pub long_name: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Quote with only a price, used when a provider reports nothing else.
    pub fn bare(symbol: impl Into<String>, price: BigDecimal) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            previous_close: None,
            change: None,
            change_pct: None,
            currency: None,
            long_name: None,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Fetched within the cache TTL.
    Live,
    /// The latest fetch failed; this is the last quote that succeeded.
    LastKnown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookEntry {
    pub quote: PriceQuote,
    pub source: PriceSource,
}

/// The prices one roll-up is computed against, keyed by uppercase symbol.
/// A symbol absent from the book has no usable price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceBook {
    entries: BTreeMap<String, BookEntry>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book of live prices from plain `(symbol, price)` pairs.
    pub fn from_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, BigDecimal)>,
        S: Into<String>,
    {
        let mut book = Self::new();
        for (symbol, price) in prices {
            book.insert(PriceQuote::bare(symbol, price), PriceSource::Live);
        }
        book
    }

    pub fn insert(&mut self, quote: PriceQuote, source: PriceSource) {
        self.entries
            .insert(quote.symbol.clone(), BookEntry { quote, source });
    }

    pub fn get(&self, symbol: &str) -> Option<&BookEntry> {
        self.entries.get(symbol)
    }

    pub fn price(&self, symbol: &str) -> Option<&BigDecimal> {
        self.entries.get(symbol).map(|e| &e.quote.price)
    }

    pub fn source(&self, symbol: &str) -> Option<PriceSource> {
        self.entries.get(symbol).map(|e| e.source)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BookEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotesResponse {
    pub quotes: Vec<BookEntry>,
    pub missing: Vec<String>,
}
