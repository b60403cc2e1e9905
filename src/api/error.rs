//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::corrections::CorrectionError;
use crate::db::DatabaseError;
use crate::grade::GradeError;
use crate::ingest::IngestError;
use crate::producer::ProducerError;
use crate::review::ReviewError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Extraction producer unavailable: {0}")]
    ProducerUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::ProducerUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PRODUCER_UNAVAILABLE",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DatabaseError::InvalidEnum { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CorrectionError> for ApiError {
    fn from(err: CorrectionError) -> Self {
        match err {
            CorrectionError::Database(db) => db.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Database(db) => db.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<GradeError> for ApiError {
    fn from(err: GradeError) -> Self {
        match err {
            GradeError::Database(db) => db.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Producer(ProducerError::Unavailable(detail)) => {
                ApiError::ProducerUnavailable(detail)
            }
            IngestError::Producer(ProducerError::Malformed(detail)) => {
                ApiError::Internal(format!("producer output malformed: {detail}"))
            }
            IngestError::Database(db) => db.into(),
        }
    }
}
