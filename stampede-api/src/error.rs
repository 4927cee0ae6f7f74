//! Error Types for the Stampede API
//!
//! Structured error responses with stable error codes, serialized as JSON
//! with the matching HTTP status. The engine is fail-open, so the only
//! engine error that normally reaches a client is the origin's own failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use stampede_core::CacheError;
use std::fmt;
use uuid::Uuid;

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request contains invalid input data
    InvalidInput,

    /// Requested product does not exist
    ProductNotFound,

    /// Requested strategy name is not one of the five known strategies
    StrategyNotFound,

    /// The origin loader failed; the cache could not mask the failure
    OriginFailure,

    /// Internal server error
    InternalError,

    /// Remote store is unreachable
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::ProductNotFound | ErrorCode::StrategyNotFound => StatusCode::NOT_FOUND,
            ErrorCode::OriginFailure => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Structured API error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn product_not_found(product_id: Uuid) -> Self {
        Self::new(
            ErrorCode::ProductNotFound,
            format!("Product {product_id} not found"),
        )
    }

    pub fn strategy_not_found(strategy: &str) -> Self {
        Self::new(
            ErrorCode::StrategyNotFound,
            format!(
                "Unknown strategy '{strategy}', expected one of: basic, jitter, \
                 jitter-swr, jitter-lock, full-protection"
            ),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<CacheError> for ApiError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Origin(origin) => Self::new(ErrorCode::OriginFailure, origin.to_string()),
            CacheError::Store(store) => {
                Self::new(ErrorCode::ServiceUnavailable, store.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        (status, Json(self)).into_response()
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use stampede_core::{OriginError, StoreError};

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorCode::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ProductNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StrategyNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::OriginFailure.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ProductNotFound).unwrap();
        assert_eq!(json, "\"PRODUCT_NOT_FOUND\"");
    }

    #[test]
    fn test_origin_error_maps_to_bad_gateway() {
        let api_error: ApiError = CacheError::Origin(OriginError::new("db is down")).into();
        assert_eq!(api_error.code, ErrorCode::OriginFailure);
        assert!(api_error.message.contains("db is down"));
    }

    #[test]
    fn test_store_error_maps_to_service_unavailable() {
        let api_error: ApiError = CacheError::Store(StoreError::Connection {
            reason: "refused".to_string(),
        })
        .into();
        assert_eq!(api_error.code, ErrorCode::ServiceUnavailable);
    }
}
