//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps export failures from billbook-core and billbook-archive to HTTP
//! status codes with JSON error bodies. Only errors detected before the
//! first archive byte become responses; a failure mid-stream aborts the
//! body instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use billbook_archive::ExportError;
use billbook_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// Internal error details are never exposed to clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request values out of range (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request could not be parsed (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// The transaction data source failed (502).
    #[error("upstream data source error: {0}")]
    UpstreamError(String),

    /// Service dependency not configured (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::UpstreamError(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        }
    }

    /// Construct a service unavailable error (503).
    pub fn service_unavailable(msg: &str) -> Self {
        Self::ServiceUnavailable(msg.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal/upstream error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::UpstreamError(_) => "Transaction data is temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::UpstreamError(_) => tracing::error!(error = %self, "data source error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Source(source) => Self::UpstreamError(source.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::InvalidRequest(core) => core.into(),
            ExportError::CompanyNotFound(id) => Self::NotFound(format!("company {id}")),
            ExportError::Source(source) => Self::UpstreamError(source.to_string()),
            ExportError::Report(report) => Self::Internal(report.to_string()),
        }
    }
}
