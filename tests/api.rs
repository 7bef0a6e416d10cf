//! API tests for the tag/holding/roll-up endpoints.
//!
//! The router runs against the in-memory store and a scripted price provider,
//! so no database or network access is needed.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tower::ServiceExt;

use tagfolio_backend::app::create_app;
use tagfolio_backend::db::MemoryStore;
use tagfolio_backend::external::price_provider::{ExternalQuote, PriceProvider, PriceProviderError};
use tagfolio_backend::models::PricePoint;
use tagfolio_backend::services::price_service::PriceService;
use tagfolio_backend::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct FixedPrices {
    prices: HashMap<&'static str, &'static str>,
    requested: Mutex<Vec<String>>,
}

#[async_trait]
impl PriceProvider for FixedPrices {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ExternalQuote, PriceProviderError> {
        self.requested.lock().push(symbol.to_string());
        match self.prices.get(symbol) {
            Some(price) => Ok(ExternalQuote {
                symbol: symbol.to_string(),
                price: dec(price),
                previous_close: None,
                currency: Some("USD".into()),
                long_name: (symbol == "AAPL").then(|| "Apple Inc.".to_string()),
            }),
            None => Err(PriceProviderError::NotFound),
        }
    }

    async fn fetch_daily_history(&self, symbol: &str, days: u32) -> Result<Vec<PricePoint>, PriceProviderError> {
        self.requested.lock().push(symbol.to_string());
        let price = self.prices.get(symbol).ok_or(PriceProviderError::NotFound)?;
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Ok((0..days.min(3))
            .map(|i| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close: dec(price),
            })
            .collect())
    }
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn app() -> Router {
    app_with_provider().0
}

fn app_with_provider() -> (Router, Arc<FixedPrices>) {
    let provider = Arc::new(FixedPrices {
        prices: HashMap::from([("AAPL", "150"), ("MSFT", "250")]),
        requested: Mutex::new(Vec::new()),
    });
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        prices: PriceService::new(provider.clone(), Duration::from_secs(60), Duration::from_secs(5)),
    };
    (create_app(state), provider)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Decimals come back as strings; compare them numerically.
fn num(value: &Value) -> BigDecimal {
    match value {
        Value::String(s) => dec(s),
        Value::Number(n) => dec(&n.to_string()),
        other => panic!("not a decimal: {}", other),
    }
}

async fn create_holding(app: &Router, symbol: &str, quantity: u32, cost: u32, tags: &[&str]) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/holdings",
        Some(json!({ "symbol": symbol, "quantity": quantity, "cost_basis": cost, "tags": tags })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "creating {}: {}", symbol, body);
    body
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tag_crud() {
    let app = app();

    let (status, tag) = send(&app, "POST", "/api/tags", Some(json!({ "name": "tech" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = tag["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", "/api/tags", Some(json!({ "name": "tech" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/api/tags", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, renamed) = send(
        &app,
        "PUT",
        &format!("/api/tags/{}", id),
        Some(json!({ "name": "technology" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "technology");

    let (status, tags) = send(&app, "GET", "/api/tags", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/tags/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/tags/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_tag_detaches_it_from_holdings() {
    let app = app();
    let holding = create_holding(&app, "AAPL", 1, 100, &["tech", "us"]).await;

    let (_, tags) = send(&app, "GET", "/api/tags", None).await;
    let tech = tags
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "tech")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/tags/{}", tech), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, holding) = send(
        &app,
        "GET",
        &format!("/api/holdings/{}", holding["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(holding["tags"], json!(["us"]));
}

// ---------------------------------------------------------------------------
// Holdings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_holding_crud_with_prices() {
    let app = app();

    let created = create_holding(&app, "aapl", 10, 100, &["tech"]).await;
    assert_eq!(created["symbol"], "AAPL");
    assert_eq!(created["price_status"], "live");
    assert_eq!(num(&created["market_value"]), dec("1500"));
    assert_eq!(num(&created["unrealized_gain_loss"]), dec("500"));
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/holdings/{}", id),
        Some(json!({ "symbol": "AAPL", "quantity": 20, "cost_basis": 100, "tags": ["tech", "core"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&updated["market_value"]), dec("3000"));
    assert_eq!(updated["tags"], json!(["core", "tech"]));

    let (status, list) = send(&app, "GET", "/api/holdings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/holdings/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &format!("/api/holdings/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_holding_validation() {
    let app = app();

    let bad_bodies = [
        json!({ "symbol": "AAPL", "quantity": 0, "cost_basis": 100 }),
        json!({ "symbol": "AAPL", "quantity": 1, "cost_basis": -1 }),
        json!({ "symbol": "", "quantity": 1, "cost_basis": 1 }),
        json!({ "symbol": "NOT A SYMBOL", "quantity": 1, "cost_basis": 1 }),
    ];

    for body in bad_bodies {
        let (status, _) = send(&app, "POST", "/api/holdings", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", body);
    }
}

#[tokio::test]
async fn test_holding_carries_long_name() {
    let app = app();

    let created = create_holding(&app, "AAPL", 1, 100, &[]).await;
    assert_eq!(created["long_name"], "Apple Inc.");
}

#[tokio::test]
async fn test_closed_holding_valued_at_closing_price() {
    let app = app();

    let (status, sold) = send(
        &app,
        "POST",
        "/api/holdings",
        Some(json!({ "symbol": "AAPL", "quantity": 10, "cost_basis": 100, "closed": true, "closing_price": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sold);
    assert_eq!(sold["price_status"], "closed");
    assert_eq!(num(&sold["current_price"]), dec("120"));
    assert_eq!(num(&sold["market_value"]), dec("1200"));
    assert_eq!(num(&sold["unrealized_gain_loss"]), dec("200"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/holdings",
        Some(json!({ "symbol": "AAPL", "quantity": 10, "cost_basis": 100, "closing_price": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unpriced_holding_is_reported_missing() {
    let app = app();

    let created = create_holding(&app, "GHOST", 5, 10, &[]).await;
    assert_eq!(created["price_status"], "missing");
    assert!(created["market_value"].is_null());
}

// ---------------------------------------------------------------------------
// Roll-ups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tag_rollup() {
    let app = app();
    create_holding(&app, "AAPL", 10, 100, &["tech"]).await;
    create_holding(&app, "MSFT", 5, 200, &["tech"]).await;
    create_holding(&app, "GHOST", 7, 1, &["tech", "speculative"]).await;

    let (status, report) = send(&app, "GET", "/api/rollups/tags", None).await;
    assert_eq!(status, StatusCode::OK);

    let tags = report["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 1, "speculative has no priced holdings: {}", report);
    assert_eq!(tags[0]["tag"], "tech");
    assert_eq!(num(&tags[0]["total_value"]), dec("2750"));
    assert_eq!(num(&tags[0]["gain_loss"]), dec("750"));
    assert_eq!(report["missing"], json!(["GHOST"]));
    assert_eq!(report["unpriced"], json!(true));

    let (status, summary) = send(&app, "GET", "/api/rollups/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(num(&summary["total_market_value"]), dec("2750"));
    assert_eq!(num(&summary["total_unrealized_gain_loss"]), dec("750"));
}

#[tokio::test]
async fn test_rollup_is_idempotent() {
    let app = app();
    create_holding(&app, "AAPL", 10, 100, &["tech"]).await;

    let (_, first) = send(&app, "GET", "/api/rollups/tags", None).await;
    let (_, second) = send(&app, "GET", "/api/rollups/tags", None).await;
    assert_eq!(first["tags"], second["tags"]);
    assert_eq!(first["total"], second["total"]);
}

#[tokio::test]
async fn test_tag_timeseries() {
    let app = app();
    create_holding(&app, "AAPL", 2, 100, &["tech"]).await;

    let (status, series) = send(&app, "GET", "/api/rollups/tags/timeseries?days=3", None).await;
    assert_eq!(status, StatusCode::OK);
    let tech = series["tags"]["tech"].as_array().unwrap();
    assert_eq!(tech.len(), 3);
    assert_eq!(num(&tech[0]["market_value"]), dec("300"));
    assert_eq!(num(&tech[0]["unrealized_gain_loss"]), dec("100"));

    let (status, _) = send(&app, "GET", "/api/rollups/tags/timeseries?days=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_portfolio_rolls_up_to_zero() {
    let app = app();

    let (status, report) = send(&app, "GET", "/api/rollups/tags", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(report["tags"].as_array().unwrap().is_empty());
    assert_eq!(num(&report["total"]["market_value"]), dec("0"));
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_quotes_endpoint() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/prices?symbols=msft,AAPL,NOPE", None).await;
    assert_eq!(status, StatusCode::OK);
    let symbols: Vec<&str> = body["quotes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["quote"]["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    assert_eq!(body["missing"], json!(["NOPE"]));

    let (status, _) = send(&app, "GET", "/api/prices?symbols=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_endpoint() {
    let app = app();

    let (status, body) = send(&app, "GET", "/api/prices/aapl/history?days=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "AAPL");
    assert_eq!(body["points"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", "/api/prices/NOPE/history", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/prices/AAPL/history?days=1000", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_price_routes_reject_malformed_symbols() {
    let (app, provider) = app_with_provider();

    let (status, _) = send(&app, "GET", "/api/prices/..%2Fv7%2Ffinance%3Fx%3D1/history", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/prices?symbols=NOT%20A%20SYMBOL,a%2Fb", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/prices?symbols=AAPL,a%2Fb", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let requested = provider.requested.lock().clone();
    assert!(requested.is_empty(), "provider saw {:?}", requested);
}

#[tokio::test]
async fn test_health() {
    let app = app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "price_provider": "fixed" }));
}
