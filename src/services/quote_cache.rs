use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::PriceQuote;

/// Last successful quote per symbol.
///
/// Entries are never evicted: a quote older than the TTL is no longer served as
/// live, but it stays around as the last-known fallback when the provider fails.
#[derive(Clone)]
pub struct QuoteCache {
    quotes: Arc<DashMap<String, PriceQuote>>,
    ttl: chrono::Duration,
}

impl QuoteCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            quotes: Arc::new(DashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(60)),
        }
    }

    /// The cached quote if it was fetched within the TTL.
    pub fn fresh(&self, symbol: &str) -> Option<PriceQuote> {
        self.fresh_at(symbol, Utc::now())
    }

    fn fresh_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<PriceQuote> {
        self.quotes
            .get(symbol)
            .filter(|q| now - q.fetched_at < self.ttl)
            .map(|q| q.value().clone())
    }

    /// The cached quote regardless of age.
    pub fn last_known(&self, symbol: &str) -> Option<PriceQuote> {
        self.quotes.get(symbol).map(|q| q.value().clone())
    }

    pub fn store(&self, quote: PriceQuote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
