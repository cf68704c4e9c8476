//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use beacon_core::BeaconError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - The radio or scanner cannot be used right now.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<String>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "radio_unavailable",
    "message": "Bluetooth radio is disabled. Run 'bluetoothctl power on' and retry discovery.",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "radio_unavailable").
    #[schema(example = "radio_unavailable")]
    pub error: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::ServiceUnavailable {
                error_code,
                message,
                details,
            } => {
                tracing::warn!(error_code = %error_code, message = %message, "Service unavailable");

                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(serde_json::Value::String),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from beacon_core errors.
///
/// Errors caused by what the client sent are 400; everything else means the
/// radio stack or the host cannot serve the request right now.
impl From<BeaconError> for ApiError {
    fn from(err: BeaconError) -> Self {
        let error_code = err.error_code().to_ascii_lowercase();
        let message = err.to_string();

        match err {
            BeaconError::MalformedEvent(_)
            | BeaconError::ConfigNotFound(_)
            | BeaconError::ConfigParseError(_)
            | BeaconError::ConfigValidationError(_) => Self::BadRequest {
                error_code,
                message,
            },
            BeaconError::ScanFailed(failure) => Self::ServiceUnavailable {
                error_code,
                message,
                details: failure.code().map(|c| format!("code {c}")),
            },
            BeaconError::AdapterNotFound(_)
            | BeaconError::RadioUnavailable
            | BeaconError::IoError(_) => Self::ServiceUnavailable {
                error_code,
                message,
                details: None,
            },
        }
    }
}

/// A request body that could not be decoded.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            error_code: "invalid_body".to_string(),
            message: rejection.body_text(),
        }
    }
}
