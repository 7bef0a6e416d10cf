use axum::{Json, Router};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use uuid::Uuid;
use tracing::{info, error};
use crate::errors::AppError;
use crate::models::{CreateHolding, HoldingView, UpdateHolding};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_holding).get(list_holdings))
        .route("/:id", get(get_holding).put(update_holding).delete(delete_holding))
}

pub async fn create_holding(
    State(state): State<AppState>,
    Json(input): Json<CreateHolding>,
) -> Result<(StatusCode, Json<HoldingView>), AppError> {
    info!("POST /holdings - Creating holding for {}", input.symbol);
    let holding = services::holding_service::create(state.store.as_ref(), input).await?;
    let view = services::holding_service::price_one(holding, &state.prices).await;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_holdings(
    State(state): State<AppState>,
) -> Result<Json<Vec<HoldingView>>, AppError> {
    info!("GET /holdings - Listing holdings with current prices");
    let holdings = services::holding_service::list_priced(state.store.as_ref(), &state.prices).await
        .map_err(|e| {
            error!("Failed to list holdings: {}", e);
            e
        })?;
    Ok(Json(holdings))
}

pub async fn get_holding(
    State(state): State<AppState>,
    Path(holding_id): Path<Uuid>,
) -> Result<Json<HoldingView>, AppError> {
    info!("GET /holdings/{} - Getting holding", holding_id);
    let holding = services::holding_service::fetch_one(state.store.as_ref(), holding_id).await
        .map_err(|e| {
            error!("Failed to get holding {}: {}", holding_id, e);
            e
        })?;
    Ok(Json(services::holding_service::price_one(holding, &state.prices).await))
}

pub async fn update_holding(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateHolding>,
) -> Result<Json<HoldingView>, AppError> {
    info!("PUT /holdings/{} - Updating holding", id);
    let updated = services::holding_service::update(state.store.as_ref(), id, input).await
        .map_err(|e| {
            error!("Failed to update holding {}: {}", id, e);
            e
        })?;
    Ok(Json(services::holding_service::price_one(updated, &state.prices).await))
}

pub async fn delete_holding(
    State(state): State<AppState>,
    Path(holding_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /holdings/{} - Deleting holding", holding_id);
    services::holding_service::delete(state.store.as_ref(), holding_id).await
        .map_err(|e| {
            error!("Failed to delete holding {}: {}", holding_id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
