use axum::extract::{Path, State};
use axum::{Json, Router};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateTag, Tag, UpdateTag};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tag).get(fetch_tags))
        .route("/:id", get(get_tag).put(update_tag).delete(delete_tag))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Json(data): Json<CreateTag>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    info!("POST /tags - Creating tag {}", data.name);
    let tag = services::tag_service::create(state.store.as_ref(), data).await
        .map_err(|e| {
            error!("Failed to create tag: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn fetch_tags(
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>, AppError> {
    info!("GET /tags - Fetching all tags");
    let tags = services::tag_service::fetch_all(state.store.as_ref()).await
        .map_err(|e| {
            error!("Failed to fetch tags: {}", e);
            e
        })?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tag>, AppError> {
    info!("GET /tags/{} - Fetching tag", id);
    let tag = services::tag_service::fetch_one(state.store.as_ref(), id).await
        .map_err(|e| {
            error!("Failed to fetch tag {}: {}", id, e);
            e
        })?;
    Ok(Json(tag))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateTag>,
) -> Result<Json<Tag>, AppError> {
    info!("PUT /tags/{} - Renaming tag", id);
    let tag = services::tag_service::update(state.store.as_ref(), id, data).await
        .map_err(|e| {
            error!("Failed to update tag {}: {}", id, e);
            e
        })?;
    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /tags/{} - Deleting tag", id);
    services::tag_service::delete(state.store.as_ref(), id).await
        .map_err(|e| {
            error!("Failed to delete tag {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
