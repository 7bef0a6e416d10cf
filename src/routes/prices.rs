use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::get;
use serde::Deserialize;
use tracing::{info, error, warn};

use crate::errors::AppError;
use crate::models::{PriceHistory, QuotesResponse};
use crate::services::holding_service;
use crate::services::rollup_service::{DEFAULT_TIMESERIES_DAYS, MAX_TIMESERIES_DAYS};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_quotes))
        .route("/:symbol/history", get(get_history))
}

#[derive(Debug, Deserialize)]
pub struct QuotesParams {
    /// Comma-separated, e.g. `AAPL,MSFT`
    pub symbols: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub days: Option<u32>,
}

pub async fn get_quotes(
    State(state): State<AppState>,
    Query(params): Query<QuotesParams>,
) -> Result<Json<QuotesResponse>, AppError> {
    info!("GET /prices?symbols={} - Getting quotes", params.symbols);
    let symbols = params
        .symbols
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(holding_service::validate_symbol)
        .collect::<Result<Vec<String>, AppError>>()
        .map_err(|e| {
            warn!("Rejected quote request for {}: {}", params.symbols, e);
            e
        })?;
    if symbols.is_empty() {
        return Err(AppError::Validation("symbols cannot be empty".into()));
    }

    Ok(Json(state.prices.quotes(&symbols).await))
}

pub async fn get_history(
    Path(symbol): Path<String>,
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<PriceHistory>, AppError> {
    let days = params.days.unwrap_or(DEFAULT_TIMESERIES_DAYS);
    info!("GET /prices/{}/history - Getting {} days of closes", symbol, days);
    if days == 0 || days > MAX_TIMESERIES_DAYS {
        return Err(AppError::Validation(format!("days must be between 1 and {}", MAX_TIMESERIES_DAYS)));
    }

    let symbol = holding_service::validate_symbol(&symbol)?;
    let points = state.prices.history(&symbol, days).await
        .map_err(|e| {
            match &e {
                AppError::RateLimited => warn!("Rate limited fetching history for {}", symbol),
                _ => error!("Failed to fetch history for {}: {}", symbol, e),
            }
            e
        })?;
    Ok(Json(PriceHistory { symbol, points }))
}
