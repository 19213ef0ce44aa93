//! axum router for the prediction service.
//!
//! Handlers stay thin: they read the upload, hand the CPU-bound work to a
//! blocking thread and map the outcome onto status codes.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{ErrorCode, PloidyError};
use crate::data::decode::decode_upload;
use crate::inference::service::Pipeline;

use super::dto::{ErrorBody, HealthResponse, MessageResponse, PredictResponse};

/// Multipart field carrying the spreadsheet.
pub const UPLOAD_FIELD: &str = "file";

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Error returned by handlers, already mapped to a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody::new(code, message),
        }
    }
}

impl From<PloidyError> for ApiError {
    fn from(err: PloidyError) -> Self {
        let status = match &err {
            PloidyError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PloidyError::Decode(_) => StatusCode::BAD_REQUEST,
            PloidyError::ModelUnavailable(_)
            | PloidyError::Config(_)
            | PloidyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !err.is_client_error() {
            error!(error = %err, "request failed");
        }
        let mut body = ErrorBody::new(err.code(), err.to_string());
        if let PloidyError::Validation(report) = err {
            body.issues = Some(report);
        }
        Self { status, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build the router with CORS and the upload size limit applied.
pub fn router(state: Arc<AppState>, cfg: &AppCfg) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
        .layer(cors_layer(&cfg.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "API is up",
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        features: state.pipeline.store().schema().len(),
    })
}

async fn predict(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let (file_name, bytes) = read_upload(&mut multipart).await?;
    info!(file = ?file_name, bytes = bytes.len(), "upload received");

    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::task::spawn_blocking(move || {
        let table = decode_upload(file_name.as_deref(), &bytes)?;
        pipeline.run(&table)
    })
    .await
    .map_err(|e| PloidyError::internal(format!("scoring task failed: {e}")))??;

    Ok(Json(PredictResponse {
        results: outcome.predictions,
    }))
}

/// Pull the `file` field out of the multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(Option<String>, Vec<u8>), ApiError> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::new(e.status(), ErrorCode::DecodeFailed, e.body_text()))?;
        let Some(field) = field else {
            return Err(PloidyError::decode(format!("multipart field '{UPLOAD_FIELD}' is missing")).into());
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), ErrorCode::DecodeFailed, e.body_text()))?;
        return Ok((file_name, bytes.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ValidationIssue;

    #[test]
    fn validation_errors_carry_issues() {
        let err = ApiError::from(PloidyError::invalid(ValidationIssue::column(
            "Morfo",
            "required column is missing",
        )));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body.code, ErrorCode::InvalidInput as u32);
        assert_eq!(err.body.issues.as_ref().map(|r| r.len()), Some(1));
    }

    #[test]
    fn server_failures_map_to_500() {
        let err = ApiError::from(PloidyError::model_missing("gone"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.body.issues.is_none());
        let err = ApiError::from(PloidyError::decode("not a spreadsheet"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
