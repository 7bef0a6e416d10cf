use crate::external::price_provider::{decimal_from_f64, ExternalQuote, PriceProvider, PriceProviderError};
use crate::models::PricePoint;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart API. No API key required.
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self::with_base_url(CHART_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; Tagfolio/0.1)")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range: &str) -> Result<YahooResult, PriceProviderError> {
        let url = format!("{}/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            reqwest::StatusCode::NOT_FOUND => return Err(PriceProviderError::NotFound),
            _ => {}
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        first_result(body)
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    symbol: String,
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn first_result(body: YahooChartResponse) -> Result<YahooResult, PriceProviderError> {
    if let Some(err) = body.chart.error {
        if err.code == "Not Found" {
            return Err(PriceProviderError::NotFound);
        }
        return Err(PriceProviderError::BadResponse(err.description));
    }

    body.chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| PriceProviderError::BadResponse("missing result".into()))
}

/// Maps a day count onto the coarse ranges the chart API accepts.
fn range_for_days(days: u32) -> &'static str {
    match days {
        0..=5 => "5d",
        6..=30 => "1mo",
        31..=90 => "3mo",
        91..=180 => "6mo",
        181..=365 => "1y",
        _ => "2y",
    }
}

fn quote_from_result(result: &YahooResult) -> Result<ExternalQuote, PriceProviderError> {
    let meta = &result.meta;

    // Fall back to the last close when the market price is absent (e.g. halted).
    let last_close = result
        .indicators
        .quote
        .first()
        .and_then(|q| q.close.iter().rev().find_map(|c| *c));

    let price = meta
        .regular_market_price
        .or(last_close)
        .ok_or(PriceProviderError::NotFound)?;

    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .map(decimal_from_f64)
        .transpose()?;

    Ok(ExternalQuote {
        symbol: meta.symbol.to_uppercase(),
        price: decimal_from_f64(price)?,
        previous_close,
        currency: meta.currency.clone(),
        long_name: meta.long_name.clone().or_else(|| meta.short_name.clone()),
    })
}

/// The newest `days` daily closes, oldest first. The chart ranges are coarser
/// than a day count, so the series is cut down to match other providers.
fn history_from_result(result: &YahooResult, days: u32) -> Result<Vec<PricePoint>, PriceProviderError> {
    // timestamp aligns with close list by index
    let closes = &result
        .indicators
        .quote
        .first()
        .ok_or_else(|| PriceProviderError::BadResponse("missing quote".into()))?
        .close;

    let mut out = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        // skip missing closes
        let Some(close) = closes.get(i).and_then(|v| *v) else { continue };

        let dt = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| PriceProviderError::Parse("bad timestamp".into()))?;

        out.push(PricePoint {
            date: dt.date_naive(),
            close: decimal_from_f64(close)?,
        });
    }

    out.sort_by_key(|p| p.date);
    out.dedup_by_key(|p| p.date);

    let keep = days as usize;
    if out.len() > keep {
        out.drain(..out.len() - keep);
    }
    Ok(out)
}

#[async_trait]
impl PriceProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        let result = self.fetch_chart(symbol, "5d").await?;
        quote_from_result(&result)
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        let result = self.fetch_chart(symbol, range_for_days(days)).await?;
        history_from_result(&result, days)
    }
}
