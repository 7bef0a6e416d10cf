use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub price_provider: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    debug!("GET /health");
    Json(Health {
        status: "ok",
        price_provider: state.prices.provider_name(),
    })
}
