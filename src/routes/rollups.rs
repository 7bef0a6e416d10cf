use axum::extract::{Query, State};
use axum::{Json, Router};
use axum::routing::get;
use tracing::{info, error};

use crate::errors::AppError;
use crate::models::{PortfolioSummary, RollUpReport, TagTimeseries, TimeseriesParams};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(get_tag_rollup))
        .route("/tags/timeseries", get(get_tag_timeseries))
        .route("/summary", get(get_summary))
}

pub async fn get_tag_rollup(
    State(state): State<AppState>,
) -> Result<Json<RollUpReport>, AppError> {
    info!("GET /rollups/tags - Computing per-tag roll-up");
    let report = services::rollup_service::tag_rollup(state.store.as_ref(), &state.prices).await
        .map_err(|e| {
            error!("Failed to compute tag roll-up: {}", e);
            e
        })?;
    Ok(Json(report))
}

pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<PortfolioSummary>, AppError> {
    info!("GET /rollups/summary - Computing portfolio totals");
    let summary = services::rollup_service::summary(state.store.as_ref(), &state.prices).await
        .map_err(|e| {
            error!("Failed to compute summary: {}", e);
            e
        })?;
    Ok(Json(summary))
}

pub async fn get_tag_timeseries(
    State(state): State<AppState>,
    Query(params): Query<TimeseriesParams>,
) -> Result<Json<TagTimeseries>, AppError> {
    info!("GET /rollups/tags/timeseries - days={:?}", params.days);
    let series = services::rollup_service::tag_timeseries(state.store.as_ref(), &state.prices, params.days).await
        .map_err(|e| {
            error!("Failed to compute tag timeseries: {}", e);
            e
        })?;
    Ok(Json(series))
}
