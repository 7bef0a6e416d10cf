use crate::external::price_provider::{ExternalQuote, PriceProvider, PriceProviderError};
use crate::models::PricePoint;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;

const BASE_URL: &str = "https://api.twelvedata.com";

pub struct TwelveDataProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TwelveDataProvider {
    pub fn from_env() -> Result<Self, PriceProviderError> {
        let api_key = std::env::var("TWELVEDATA_API_KEY")
            .map_err(|_| PriceProviderError::BadResponse("TWELVEDATA_API_KEY not set".into()))?;

        Ok(Self::new(api_key))
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TwelveDataQuoteResponse {
    symbol: Option<String>,
    name: Option<String>,
    currency: Option<String>,
    close: Option<String>,
    previous_close: Option<String>,

    // Error handling
    status: Option<String>,
    message: Option<String>,
    code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TwelveDataTimeSeriesResponse {
    values: Option<Vec<TwelveDataValue>>,
    status: String,

    // Error handling
    message: Option<String>,
    code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TwelveDataValue {
    datetime: String,
    close: String,
}

/// Twelve Data reports every failure as `status: "error"` with a code and message.
fn classify_error(code: Option<u32>, message: Option<String>) -> PriceProviderError {
    match (code, message) {
        (Some(429), _) => PriceProviderError::RateLimited,
        (_, Some(msg)) if msg.contains("API rate limit") || msg.contains("credits") => {
            PriceProviderError::RateLimited
        }
        (Some(404), _) => PriceProviderError::NotFound,
        (_, Some(msg)) => PriceProviderError::BadResponse(msg),
        (Some(code), None) => PriceProviderError::BadResponse(format!("API error code {}", code)),
        (None, None) => PriceProviderError::BadResponse("API returned status: error".into()),
    }
}

fn parse_decimal(raw: &str) -> Result<BigDecimal, PriceProviderError> {
    raw.parse::<BigDecimal>()
        .map_err(|e| PriceProviderError::Parse(e.to_string()))
}

fn quote_from_response(
    requested: &str,
    body: TwelveDataQuoteResponse,
) -> Result<ExternalQuote, PriceProviderError> {
    if body.status.as_deref() == Some("error") {
        return Err(classify_error(body.code, body.message));
    }

    let close = body
        .close
        .ok_or_else(|| PriceProviderError::BadResponse("missing close in quote".into()))?;

    Ok(ExternalQuote {
        symbol: body.symbol.unwrap_or_else(|| requested.to_string()).to_uppercase(),
        price: parse_decimal(&close)?,
        previous_close: body.previous_close.as_deref().map(parse_decimal).transpose()?,
        currency: body.currency,
        long_name: body.name,
    })
}

fn history_from_response(
    body: TwelveDataTimeSeriesResponse,
) -> Result<Vec<PricePoint>, PriceProviderError> {
    if body.status != "ok" {
        return Err(classify_error(body.code, body.message));
    }

    let values = body
        .values
        .ok_or_else(|| PriceProviderError::BadResponse("missing values in response".into()))?;

    let mut points = values
        .into_iter()
        .map(|v| -> Result<PricePoint, PriceProviderError> {
            // "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DD"
            let date_part = v.datetime.split(' ').next().unwrap_or(&v.datetime);
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

            Ok(PricePoint { date, close: parse_decimal(&v.close)? })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Twelve Data returns newest first, we need oldest first
    points.reverse();

    Ok(points)
}

#[async_trait]
impl PriceProvider for TwelveDataProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        let resp = self
            .client
            .get(format!("{}/quote", self.base_url))
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceProviderError::RateLimited);
        }

        let body: TwelveDataQuoteResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        quote_from_response(symbol, body)
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<PricePoint>, PriceProviderError> {
        // outputsize determines how many data points (default 30, max 5000)
        let outputsize = std::cmp::min(days, 5000).to_string();

        let resp = self
            .client
            .get(format!("{}/time_series", self.base_url))
            .query(&[
                ("symbol", symbol),
                ("interval", "1day"),
                ("outputsize", outputsize.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let body: TwelveDataTimeSeriesResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        history_from_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_parsing() {
        let body: TwelveDataQuoteResponse = serde_json::from_str(
            r#"{"symbol":"msft","name":"Microsoft Corp","currency":"USD","close":"250.10","previous_close":"245.00"}"#,
        )
        .unwrap();

        let quote = quote_from_response("MSFT", body).unwrap();
        assert_eq!(quote.symbol, "MSFT");
        assert_eq!(quote.price, "250.10".parse::<BigDecimal>().unwrap());
        assert_eq!(quote.previous_close, Some(BigDecimal::from(245)));
        assert_eq!(quote.long_name.as_deref(), Some("Microsoft Corp"));
    }

    #[test]
    fn test_rate_limit_message_is_classified() {
        let body: TwelveDataQuoteResponse = serde_json::from_str(
            r#"{"code":400,"message":"You have run out of API credits for the current minute.","status":"error"}"#,
        )
        .unwrap();

        assert!(matches!(quote_from_response("AAPL", body), Err(PriceProviderError::RateLimited)));
    }

    #[test]
    fn test_unknown_symbol_is_not_found() {
        let body: TwelveDataQuoteResponse = serde_json::from_str(
            r#"{"code":404,"message":"symbol not found: ZZZZ","status":"error"}"#,
        )
        .unwrap();

        assert!(matches!(quote_from_response("ZZZZ", body), Err(PriceProviderError::NotFound)));
    }

    #[test]
    fn test_history_is_reversed_to_oldest_first() {
        let body: TwelveDataTimeSeriesResponse = serde_json::from_str(
            r#"{"status":"ok","values":[
                {"datetime":"2024-01-03","close":"11.0"},
                {"datetime":"2024-01-02 00:00:00","close":"10.5"}
            ]}"#,
        )
        .unwrap();

        let points = history_from_response(body).unwrap();
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(points[1].close, BigDecimal::from(11));
    }
}
