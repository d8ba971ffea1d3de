//! Error types for askanai.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Trailing window whose threshold was exceeded by a rate-limited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitWindow {
    /// Last hour.
    Hourly,
    /// Last 24 hours.
    Daily,
    /// Last 7 days.
    Weekly,
}

impl RateLimitWindow {
    /// All windows in the order they are checked.
    pub const ALL: [Self; 3] = [Self::Hourly, Self::Daily, Self::Weekly];

    /// Length of the window in hours.
    #[must_use]
    pub const fn hours(self) -> i64 {
        match self {
            Self::Hourly => 1,
            Self::Daily => 24,
            Self::Weekly => 24 * 7,
        }
    }

    /// Wire code reported when this window is exceeded.
    #[must_use]
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::Hourly => "RATE_LIMIT_HOURLY",
            Self::Daily => "RATE_LIMIT_DAILY",
            Self::Weekly => "RATE_LIMIT_WEEKLY",
        }
    }
}

/// Application error type.
///
/// Client error variants carry the stable wire code rendered to callers.
/// Server error variants carry internal detail that is logged but never
/// rendered.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Validation failed: {0}")]
    Validation(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Conflict: {0}")]
    Conflict(&'static str),

    #[error("Rate limited: {}", .0.error_code())]
    RateLimited(RateLimitWindow),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,

            // 5xx Server Errors
            Self::Database(_) | Self::Config(_) | Self::ExternalService(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(code) | Self::Forbidden(code) | Self::Conflict(code) => *code,
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::RateLimited(window) => window.error_code(),
            Self::Database(_) | Self::Config(_) | Self::ExternalService(_) | Self::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Generic forbidden error.
    #[must_use]
    pub const fn forbidden() -> Self {
        Self::Forbidden("FORBIDDEN")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        (status, Json(json!({ "error": code }))).into_response()
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(_: validator::ValidationErrors) -> Self {
        Self::Validation("INVALID_INPUT")
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
