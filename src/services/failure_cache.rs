use std::sync::Arc;
use chrono::{DateTime, Utc, Duration};
use dashmap::DashMap;

use crate::external::price_provider::PriceProviderError;

/// Information about a failed quote request for a symbol
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub error_type: FailureType,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureType {
    NotFound,       // Symbol doesn't exist at the provider
    RateLimited,    // Temporary rate limit
    ApiError,       // Network, timeout, bad payloads
}

impl FailureType {
    fn ttl_minutes(self) -> i64 {
        match self {
            FailureType::NotFound => 30,
            FailureType::RateLimited => 1,
            FailureType::ApiError => 5,
        }
    }
}

impl From<&PriceProviderError> for FailureType {
    fn from(err: &PriceProviderError) -> Self {
        match err {
            PriceProviderError::NotFound => FailureType::NotFound,
            PriceProviderError::RateLimited => FailureType::RateLimited,
            _ => FailureType::ApiError,
        }
    }
}

/// Thread-safe cache of symbols whose last quote request failed.
/// While an entry is live the symbol is not sent to the provider again.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<String, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a symbol is in the failure cache and the failure is still valid
    pub fn is_failed(&self, symbol: &str) -> Option<FailureInfo> {
        self.is_failed_at(symbol, Utc::now())
    }

    fn is_failed_at(&self, symbol: &str, now: DateTime<Utc>) -> Option<FailureInfo> {
        if let Some(entry) = self.cache.get(symbol) {
            let info = entry.value().clone();
            let expiry = info.failed_at + Duration::minutes(info.ttl_minutes);

            if now < expiry {
                return Some(info);
            }
            // TTL expired, remove from cache
            drop(entry); // Release the read lock
            self.cache.remove(symbol);
        }
        None
    }

    pub fn record_failure(&self, symbol: &str, error_type: FailureType) {
        let info = FailureInfo {
            failed_at: Utc::now(),
            error_type,
            ttl_minutes: error_type.ttl_minutes(),
        };

        self.cache.insert(symbol.to_string(), info);
    }

    /// Clear a symbol from the failure cache (e.g., after successful fetch)
    pub fn clear(&self, symbol: &str) {
        self.cache.remove(symbol);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
