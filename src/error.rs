//! # Error Handling
//!
//! Custom error types and their HTTP representations.
//!
//! One taxonomy decision matters here: malformed frame or audio payloads are
//! *soft* failures. A live browser stream produces them constantly (truncated
//! uploads, codec hiccups), so the analysis handlers answer those with
//! `detected=false` / `success=false` bodies and never reach this module. The
//! variants below are the hard failures: a missing detector backend is
//! misconfiguration and gets its own 503, distinct from client errors.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::detector::DetectorError;

#[derive(Debug)]
pub enum AppError {
    /// Server-side problems that are nobody's fault in particular.
    Internal(String),

    /// Client sent invalid or malformed data (outside the soft-failure path).
    BadRequest(String),

    /// Requested resource does not exist.
    NotFound(String),

    /// A detector collaborator is not initialized. Misconfiguration, not
    /// bad input.
    DetectorUnavailable(String),

    /// Configuration file or environment variable problems.
    ConfigError(String),

    /// Data validation failed.
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::DetectorUnavailable(msg) => write!(f, "Detector unavailable: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

/// Converts each error variant into a JSON HTTP response:
///
/// ```json
/// {
///   "error": {
///     "type": "detector_unavailable",
///     "message": "detector backend not initialized",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "not_found",
                msg.clone(),
            ),
            AppError::DetectorUnavailable(msg) => (
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "detector_unavailable",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::ValidationError(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Only `Unavailable` escalates to a hard failure. `Timeout` and `Failed`
/// normally stay on the soft path inside the analysis handlers; reaching
/// this conversion with them means something bypassed that path.
impl From<DetectorError> for AppError {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::Unavailable => {
                AppError::DetectorUnavailable("detector backend not initialized".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_unavailable_maps_to_503() {
        let err = AppError::DetectorUnavailable("no backend".to_string());
        let resp = err.error_response();
        assert_eq!(
            resp.status(),
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_soft_detector_errors_map_to_internal() {
        let err: AppError = DetectorError::Failed("landmark model crashed".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));

        let err: AppError = DetectorError::Timeout.into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_unavailable_conversion() {
        let err: AppError = DetectorError::Unavailable.into();
        assert!(matches!(err, AppError::DetectorUnavailable(_)));
    }
}
