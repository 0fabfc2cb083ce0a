//! API error types with structured JSON responses.
//!
//! Every error body has the shape `{"detail": "<message>"}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::audit::AuditError;
use crate::pipeline::PipelineError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body rejected before reaching the pipeline. Keeps the
    /// status the extractor chose (400, 415, 422...).
    #[error("Invalid request: {message}")]
    InvalidInput { status: StatusCode, message: String },

    #[error("Pipeline Failure: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Audit Failure: {0}")]
    Audit(#[from] AuditError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::InvalidInput { status, message } => {
                tracing::debug!(status = status.as_u16(), "Request rejected");
                (*status, message.clone())
            }
            ApiError::Pipeline(e) => {
                tracing::error!(
                    kind = e.kind(),
                    provider_status = ?e.provider_status(),
                    "Request failed"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Audit(e) => {
                tracing::error!(kind = e.kind(), "Audit read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ApiError::Internal(cause) => {
                tracing::error!(cause, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}
