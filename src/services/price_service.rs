use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::Utc;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::{
    ExternalQuote, PriceProvider, PriceProviderError, MAX_CONCURRENT_QUOTES,
};
use crate::models::{PriceBook, PricePoint, PriceQuote, PriceSource, QuotesResponse};
use crate::services::failure_cache::{FailureCache, FailureType};
use crate::services::holding_service;
use crate::services::quote_cache::QuoteCache;

/// Resolves prices for roll-ups: read-through quote cache in front of the
/// provider, failure cache to stop hammering bad symbols, and last-known
/// fallback so a provider outage degrades to stale prices instead of errors.
#[derive(Clone)]
pub struct PriceService {
    provider: Arc<dyn PriceProvider>,
    quotes: QuoteCache,
    failures: FailureCache,
    fetch_timeout: Duration,
}

impl PriceService {
    pub fn new(provider: Arc<dyn PriceProvider>, quote_ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            provider,
            quotes: QuoteCache::new(quote_ttl),
            failures: FailureCache::new(),
            fetch_timeout,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Prices every symbol it can. Never fails: symbols that cannot be priced
    /// are simply absent from the returned book.
    pub async fn fetch_prices(&self, symbols: &[String]) -> PriceBook {
        let mut book = PriceBook::new();
        let mut to_fetch = Vec::new();

        for symbol in normalize_symbols(symbols) {
            if let Some(quote) = self.quotes.fresh(&symbol) {
                book.insert(quote, PriceSource::Live);
            } else if let Some(failure) = self.failures.is_failed(&symbol) {
                debug!("Skipping {} - failed {:?} at {}", symbol, failure.error_type, failure.failed_at);
                self.fall_back(&mut book, &symbol);
            } else {
                to_fetch.push(symbol);
            }
        }

        if to_fetch.is_empty() {
            return book;
        }

        info!("Fetching {} quotes from {}", to_fetch.len(), self.provider.name());

        match tokio::time::timeout(self.fetch_timeout, self.provider.fetch_quotes(&to_fetch)).await {
            Ok(Ok(mut batch)) => {
                for symbol in &to_fetch {
                    match batch.quotes.remove(symbol) {
                        Some(external) => {
                            let quote = to_price_quote(symbol, external);
                            self.quotes.store(quote.clone());
                            self.failures.clear(symbol);
                            book.insert(quote, PriceSource::Live);
                        }
                        None => {
                            let failure = batch
                                .failures
                                .get(symbol)
                                .map(FailureType::from)
                                .unwrap_or(FailureType::ApiError);
                            warn!("No quote for {} ({:?})", symbol, failure);
                            self.failures.record_failure(symbol, failure);
                            self.fall_back(&mut book, symbol);
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("Price provider {} failed for the whole batch: {}", self.provider.name(), e);
                self.fail_batch(&mut book, &to_fetch, FailureType::from(&e));
            }
            Err(_) => {
                warn!(
                    "Price provider {} timed out after {:?} for {} symbols",
                    self.provider.name(),
                    self.fetch_timeout,
                    to_fetch.len()
                );
                self.fail_batch(&mut book, &to_fetch, FailureType::ApiError);
            }
        }

        book
    }

    /// Quotes for the `/prices` endpoint: the priced entries plus the symbols
    /// that could not be priced at all.
    pub async fn quotes(&self, symbols: &[String]) -> QuotesResponse {
        let requested = normalize_symbols(symbols);
        let book = self.fetch_prices(&requested).await;

        let missing = requested
            .iter()
            .filter(|s| book.get(s).is_none())
            .cloned()
            .collect();

        QuotesResponse {
            quotes: book.entries().cloned().collect(),
            missing,
        }
    }

    /// Daily history for one symbol, with provider failures surfaced as errors.
    pub async fn history(&self, symbol: &str, days: u32) -> Result<Vec<PricePoint>, AppError> {
        let symbol = holding_service::validate_symbol(symbol)?;
        match tokio::time::timeout(self.fetch_timeout, self.provider.fetch_daily_history(&symbol, days)).await {
            Ok(Ok(points)) => Ok(points),
            Ok(Err(PriceProviderError::RateLimited)) => Err(AppError::RateLimited),
            Ok(Err(PriceProviderError::NotFound)) => {
                Err(AppError::NotFound(format!("No price history for {}", symbol)))
            }
            Ok(Err(e)) => Err(AppError::External(e.to_string())),
            Err(_) => Err(AppError::External(format!("Timed out fetching history for {}", symbol))),
        }
    }

    /// Histories for many symbols. Symbols whose history cannot be fetched are
    /// logged and left out.
    pub async fn fetch_histories(&self, symbols: &[String], days: u32) -> HashMap<String, Vec<PricePoint>> {
        let symbols = normalize_symbols(symbols);

        futures::stream::iter(symbols)
            .map(|symbol| async move {
                let result = self.history(&symbol, days).await;
                (symbol, result)
            })
            .buffer_unordered(MAX_CONCURRENT_QUOTES)
            .filter_map(|(symbol, result)| async move {
                match result {
                    Ok(points) => Some((symbol, points)),
                    Err(e) => {
                        warn!("Skipping history for {}: {}", symbol, e);
                        None
                    }
                }
            })
            .collect()
            .await
    }

    fn fail_batch(&self, book: &mut PriceBook, symbols: &[String], failure: FailureType) {
        for symbol in symbols {
            self.failures.record_failure(symbol, failure);
            self.fall_back(book, symbol);
        }
    }

    fn fall_back(&self, book: &mut PriceBook, symbol: &str) {
        match self.quotes.last_known(symbol) {
            Some(quote) => {
                info!("Using last-known price for {} from {}", symbol, quote.fetched_at);
                book.insert(quote, PriceSource::LastKnown);
            }
            None => debug!("No last-known price for {}", symbol),
        }
    }
}

/// Uppercased, trimmed, deduplicated and sorted.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    symbols
        .iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn to_price_quote(symbol: &str, external: ExternalQuote) -> PriceQuote {
    let zero = BigDecimal::from(0);

    let change = external.previous_close.as_ref().map(|prev| &external.price - prev);
    let change_pct = match (&change, &external.previous_close) {
        (Some(change), Some(prev)) if *prev != zero => {
            Some((change * BigDecimal::from(100) / prev).with_scale(4))
        }
        _ => None,
    };

    PriceQuote {
        symbol: symbol.to_string(),
        price: external.price,
        previous_close: external.previous_close,
        change,
        change_pct,
        currency: external.currency,
        long_name: external.long_name,
        fetched_at: Utc::now(),
    }
}
