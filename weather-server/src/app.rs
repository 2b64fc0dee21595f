//! Router assembly and shared handler state.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::get;
use tower_http::set_header::SetResponseHeaderLayer;

use weather_core::{ForecastProvider, GenerativeModel, ObjectStore};

use crate::handlers;

/// Long-lived collaborators shared by every request.
///
/// All three are stateless with respect to request data and immutable after
/// construction; handlers receive them by explicit injection rather than
/// ambient lookup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub model: Arc<dyn GenerativeModel>,
    pub forecast: Arc<dyn ForecastProvider>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/ingest", get(handlers::ingest).options(handlers::preflight))
        .route("/weather/all", get(handlers::weather_all).options(handlers::preflight))
        .route("/weather/{city}", get(handlers::weather_city).options(handlers::preflight))
        .route("/ai-test", get(handlers::ai_test))
        .route("/ai-debug", get(handlers::ai_debug))
        // Every response carries the permissive CORS headers, success or not.
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(state)
}
