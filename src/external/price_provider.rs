use std::collections::HashMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use futures::StreamExt;
use thiserror::Error;

use crate::models::PricePoint;

/// Upper bound on concurrent per-symbol requests in the default batch fetch.
pub const MAX_CONCURRENT_QUOTES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalQuote {
    pub symbol: String,
    pub price: BigDecimal,
    pub previous_close: Option<BigDecimal>,
    pub currency: Option<String>,
    pub long_name: Option<String>,
}

/// Result of a batch quote request. Symbols the provider could not price land
/// in `failures`; the batch itself still succeeds.
#[derive(Debug, Default)]
pub struct QuoteBatch {
    pub quotes: HashMap<String, ExternalQuote>,
    pub failures: HashMap<String, PriceProviderError>,
}

#[derive(Debug, Clone, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("symbol not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError>;

    /// Prices a set of symbols. An `Err` means the provider as a whole is
    /// unusable (unreachable, auth failure); per-symbol problems go into
    /// [`QuoteBatch::failures`].
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteBatch, PriceProviderError> {
        let results: Vec<(String, Result<ExternalQuote, PriceProviderError>)> =
            futures::stream::iter(symbols.to_vec())
                .map(|symbol| async move {
                    let result = self.fetch_quote(&symbol).await;
                    (symbol, result)
                })
                .buffer_unordered(MAX_CONCURRENT_QUOTES)
                .collect()
                .await;

        let mut batch = QuoteBatch::default();
        for (symbol, result) in results {
            match result {
                Ok(quote) => {
                    batch.quotes.insert(symbol, quote);
                }
                Err(e) => {
                    batch.failures.insert(symbol, e);
                }
            }
        }
        Ok(batch)
    }

    /// Daily closes, oldest first.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, PriceProviderError>;
}

/// Parses a provider's numeric field the same way for every provider.
pub(crate) fn decimal_from_f64(value: f64) -> Result<BigDecimal, PriceProviderError> {
    if !value.is_finite() {
        return Err(PriceProviderError::Parse(format!("non-finite price {}", value)));
    }
    value
        .to_string()
        .parse::<BigDecimal>()
        .map_err(|e| PriceProviderError::Parse(e.to_string()))
}
