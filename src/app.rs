use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ConfigError;
use crate::routes::{health, holdings, prices, rollups, tags};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/tags", tags::router())
        .nest("/api/holdings", holdings::router())
        .nest("/api/rollups", rollups::router())
        .nest("/api/prices", prices::router())
        .with_state(state)
}

/// `*` allows any origin, anything else is taken as a single exact origin.
pub fn cors_layer(allow_origin: &str) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow_origin.trim() == "*" {
        return Ok(layer.allow_origin(Any));
    }

    let origin = HeaderValue::from_str(allow_origin.trim()).map_err(|_| ConfigError::Invalid {
        var: "CORS_ALLOW_ORIGIN",
        value: allow_origin.to_string(),
    })?;
    Ok(layer.allow_origin(origin))
}
