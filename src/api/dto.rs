//! Wire shapes of the HTTP surface.

use serde::Serialize;

use crate::common::error::{ErrorCode, ValidationReport};
use crate::inference::domain::PredictionRecord;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Width of the trained feature schema.
    pub features: usize,
}

/// Body of a successful `POST /predict`.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub results: Vec<PredictionRecord>,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<ValidationReport>,
}

impl ErrorBody {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code as u32,
            issues: None,
        }
    }
}
