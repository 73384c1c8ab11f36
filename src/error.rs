use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// Error response type
///
/// `error` is a stable machine-readable kind, `message` is for humans.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "not_found")]
    pub error: String,
    pub message: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Failures raised by the CRUD service layer
#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    /// Missing or empty required input
    #[error("{0}")]
    Validation(String),
    /// No record for the given identifier
    #[error("No entity found with id {0}")]
    NotFound(RecordId),
    /// Mapping or storage failure
    #[error("{context}: {source:#}")]
    Persistence {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl CrudError {
    pub fn validation(message: impl Into<String>) -> Self {
        CrudError::Validation(message.into())
    }

    pub fn persistence(context: &'static str, source: anyhow::Error) -> Self {
        CrudError::Persistence { context, source }
    }
}

/// Custom error type for API endpoints
///
/// Every endpoint returns this on failure so the status code and the
/// `ErrorResponse` body are chosen in one place.
#[derive(Debug)]
pub enum ApiError {
    /// Service rejected the input
    Validation(String),
    /// Record not found in storage
    NotFound(RecordId),
    /// Mapping or database operation error
    Persistence(String),
    /// JSON parsing error
    JsonError(serde_json::Error),
    /// Invalid query or path parameter
    InvalidQueryParam(String),
}

impl ApiError {
    /// Stable kind string and HTTP status for this error
    pub fn kind(&self) -> (&'static str, StatusCode) {
        match self {
            ApiError::Validation(_) => ("validation", StatusCode::BAD_REQUEST),
            ApiError::NotFound(_) => ("not_found", StatusCode::NOT_FOUND),
            ApiError::Persistence(_) => ("persistence", StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::JsonError(_) => ("invalid_body", StatusCode::BAD_REQUEST),
            ApiError::InvalidQueryParam(_) => ("invalid_query", StatusCode::BAD_REQUEST),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (kind, status) = self.kind();
        let message = match self {
            ApiError::Validation(msg) => msg,
            ApiError::NotFound(id) => format!("No entity found with id {}", id),
            ApiError::Persistence(msg) => msg,
            ApiError::JsonError(err) => format!("JSON parse error: {}", err),
            ApiError::InvalidQueryParam(msg) => format!("Invalid query parameter: {}", msg),
        };

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", kind, message);
        } else {
            tracing::debug!("Request rejected ({}): {}", kind, message);
        }

        let body = Json(ErrorResponse {
            error: kind.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<CrudError> for ApiError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::Validation(msg) => ApiError::Validation(msg),
            CrudError::NotFound(id) => ApiError::NotFound(id),
            persistence @ CrudError::Persistence { .. } => {
                ApiError::Persistence(persistence.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err)
    }
}
