//! HTTP surface: `GET /health` and `POST /predict`.
//!
//! The router carries CORS, request tracing and a blanket request timeout.
//! Handlers hold no state beyond the shared [`PredictionService`].

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::PredictionService;

pub use handlers::ApiError;

/// Shared state accessible by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: PredictionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Parse one configured CORS origin into a header value.
///
/// # Errors
/// Returns a description if `origin` is not a valid header value.
pub fn parse_origin(origin: &str) -> Result<HeaderValue, String> {
    let trimmed = origin.trim();
    if trimmed.is_empty() {
        return Err("empty CORS origin".into());
    }
    trimmed
        .parse()
        .map_err(|e| format!("invalid CORS origin '{trimmed}': {e}"))
}

/// Build the router with all routes.
///
/// An empty `cors_origins` allows any origin. Origins are expected to have
/// passed [`parse_origin`]; any that do not are logged and skipped.
pub fn build_router(state: AppState, cors_origins: &[String], request_timeout: Duration) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| match parse_origin(o) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Skipping {}", e);
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
