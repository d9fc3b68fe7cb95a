//! Route handlers for `/health` and `/predict`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::application::Health;
use crate::domain::{PredictionError, PredictionInput, PredictionResult};

/// Failure translated to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Pipeline failure for this request.
    Prediction(PredictionError),
    /// Body was not a JSON object.
    BadRequest(String),
    /// The blocking task panicked or was cancelled.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    kind: &'a str,
    detail: String,
}

impl From<PredictionError> for ApiError {
    fn from(e: PredictionError) -> Self {
        Self::Prediction(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Prediction(e) => {
                let status = if e.is_client_error() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (
                    status,
                    ErrorBody {
                        error: e.to_string(),
                        kind: e.kind().as_str(),
                        detail: e.detail(),
                    },
                )
            }
            Self::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid request body".into(),
                    kind: "InvalidRequest",
                    detail: detail.clone(),
                },
            ),
            Self::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal error".into(),
                    kind: "Internal",
                    detail: detail.clone(),
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", body.kind, body.detail);
        } else {
            tracing::warn!("Request rejected ({})", body.kind);
        }
        (status, Json(body)).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(state.service.health())
}

/// Run the pipeline on the blocking pool; the reactor only parses and replies.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if !body.is_object() {
        return Err(ApiError::BadRequest(
            "expected a JSON object mapping feature names to values".into(),
        ));
    }
    let input: PredictionInput =
        serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.predict(&input))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task failed: {e}")))??;
    Ok(Json(result))
}
