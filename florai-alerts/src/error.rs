//! Error types for florai-alerts
//!
//! `PipelineError` is what the notification pipeline reports; `ApiError`
//! maps it onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Pipeline step that touched the store, carried in storage errors so the
/// caller can tell which write or read failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    /// Prediction history write
    Record,
    /// Notification preference read
    Preference,
    /// Notification document write
    Notify,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::Record => "record",
            PipelineStep::Preference => "preference",
            PipelineStep::Notify => "notify",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occurrence classifier failures
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model server could not be reached or timed out
    #[error("Model server unreachable: {0}")]
    Unavailable(String),

    /// Model server answered with a non-success status
    #[error("Model server error {0}: {1}")]
    Status(u16, String),

    /// Response body could not be understood
    #[error("Malformed model response: {0}")]
    Malformed(String),

    /// Response parsed but violates the probability invariants
    #[error("Inconsistent model output: {0}")]
    InvalidOutput(String),
}

/// Notification pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input, rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// A store read failed for infrastructure reasons
    #[error("Store unavailable during {step} step: {source}")]
    StoreUnavailable {
        step: PipelineStep,
        #[source]
        source: florai_common::Error,
    },

    /// A record or notification write failed
    #[error("Persistence error during {step} step: {source}")]
    Persistence {
        step: PipelineStep,
        #[source]
        source: florai_common::Error,
    },

    /// The classifier could not produce a prediction
    #[error("Classifier failure: {0}")]
    Classifier(#[from] ClassifierError),
}

impl PipelineError {
    pub fn persistence(step: PipelineStep, source: florai_common::Error) -> Self {
        PipelineError::Persistence { step, source }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Pipeline failure, status depends on the kind
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Pipeline(ref err) => {
                let (status, code) = match err {
                    PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                    PipelineError::StoreUnavailable { .. } => {
                        (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                    }
                    PipelineError::Persistence { .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
                    }
                    PipelineError::Classifier(_) => (StatusCode::BAD_GATEWAY, "CLASSIFIER_UNAVAILABLE"),
                };
                (status, code, err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
