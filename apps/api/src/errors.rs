use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Engine-level error taxonomy. Every operation of the matching/scoring pipeline and the
/// versioned store reports failures through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error(
        "Insufficient analysis: {succeeded} of {expected} components succeeded (minimum {required}); failed: {}",
        .failed.join(", ")
    )]
    InsufficientAnalysis {
        succeeded: usize,
        expected: usize,
        required: usize,
        failed: Vec<String>,
    },

    #[error("Skill extraction failed: {0}")]
    Extraction(String),

    #[error("No {kind} entry found for user {user_id} at company '{company}'")]
    NotFound {
        user_id: Uuid,
        company: String,
        kind: String,
    },

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream analysis error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::MalformedInput(msg) => AppError::Validation(msg),
            e @ EngineError::InsufficientAnalysis { .. } => AppError::Upstream(e.to_string()),
            EngineError::Extraction(msg) => AppError::Upstream(msg),
            e @ EngineError::NotFound { .. } => AppError::NotFound(e.to_string()),
            EngineError::StoreWrite(msg) | EngineError::StoreRead(msg) => AppError::Storage(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream analysis error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
