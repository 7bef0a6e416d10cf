use crate::external::price_provider::{ExternalQuote, PriceProvider, PriceProviderError, QuoteBatch};
use crate::models::PricePoint;
use async_trait::async_trait;
use tracing::{info, warn};

/// Routes every request to the primary provider first and hands whatever it
/// could not serve to the fallback.
pub struct MultiProvider {
    primary: Box<dyn PriceProvider>,
    fallback: Box<dyn PriceProvider>,
}

impl MultiProvider {
    pub fn new(primary: Box<dyn PriceProvider>, fallback: Box<dyn PriceProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PriceProvider for MultiProvider {
    fn name(&self) -> &'static str {
        "multi"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        match self.primary.fetch_quote(symbol).await {
            Ok(quote) => return Ok(quote),
            Err(e) => warn!(
                "{} failed to quote {}: {}. Trying {}",
                self.primary.name(),
                symbol,
                e,
                self.fallback.name()
            ),
        }
        self.fallback.fetch_quote(symbol).await
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<QuoteBatch, PriceProviderError> {
        let mut batch = match self.primary.fetch_quotes(symbols).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("{} batch failed: {}. Sending all symbols to {}", self.primary.name(), e, self.fallback.name());
                return self.fallback.fetch_quotes(symbols).await;
            }
        };

        if batch.failures.is_empty() {
            return Ok(batch);
        }

        let retry: Vec<String> = batch.failures.keys().cloned().collect();
        info!("⚠️ {} symbols unpriced by {}, trying {}", retry.len(), self.primary.name(), self.fallback.name());

        match self.fallback.fetch_quotes(&retry).await {
            Ok(second) => {
                for (symbol, quote) in second.quotes {
                    batch.failures.remove(&symbol);
                    batch.quotes.insert(symbol, quote);
                }
                // Keep the fallback's error for symbols neither provider priced.
                batch.failures.extend(second.failures);
            }
            Err(e) => warn!("Fallback provider {} failed: {}", self.fallback.name(), e),
        }

        Ok(batch)
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        match self.primary.fetch_daily_history(symbol, days).await {
            Ok(data) => {
                info!("✓ Fetched history for {} from {}", symbol, self.primary.name());
                return Ok(data);
            }
            Err(PriceProviderError::RateLimited) => {
                info!("⚠️ {} rate limited, trying fallback", self.primary.name());
            }
            Err(e) => {
                warn!("{} history error for {}: {}", self.primary.name(), symbol, e);
            }
        }

        self.fallback.fetch_daily_history(symbol, days).await
    }
}
