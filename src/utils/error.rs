//! Error handling module
//!
//! Defines error types and handling logic used in the project

use crate::models::ApiEnvelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Message returned when the provider reports quota or rate exhaustion
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try a different model or wait.";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Request validation failed (rejected before any model is tried)
    #[error("{0}")]
    Validation(String),

    /// Upstream signalled quota or rate exhaustion
    #[error("Rate limit exceeded. Please try a different model or wait.")]
    RateLimited { detail: String },

    /// Every candidate model failed to open a stream
    #[error("Failed to fetch AI response: {last}")]
    AllModelsExhausted { last: String },

    /// Generic upstream open/stream failure
    #[error("Failed to fetch AI response: {0}")]
    UpstreamFailure(String),

    /// Route not found
    #[error("Can't find {0} on this server!")]
    NotFound(String),

    /// Request body exceeded the configured limit
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl AppError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::AllModelsExhausted { .. } | AppError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error kind string (used in logs)
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found_error",
            AppError::RateLimited { .. } => "rate_limit_error",
            AppError::AllModelsExhausted { .. } => "all_models_exhausted",
            AppError::UpstreamFailure(_) => "upstream_error",
            AppError::PayloadTooLarge => "payload_too_large",
            AppError::Config(_) => "internal_error",
        }
    }

    /// Whether detailed error information should be logged
    pub fn should_log_details(&self) -> bool {
        !matches!(
            self,
            AppError::Validation(_) | AppError::NotFound(_) | AppError::PayloadTooLarge
        )
    }

    /// Convert to the response envelope
    pub fn to_envelope(&self) -> ApiEnvelope<()> {
        ApiEnvelope::fail(self.to_string())
    }
}

/// Implement IntoResponse trait to allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.should_log_details() {
            match &self {
                AppError::RateLimited { detail } => {
                    tracing::error!("Application error: {} ({}) - Status code: {}", self, detail, status);
                }
                _ => tracing::error!("Application error: {} - Status code: {}", self, status),
            }
        } else {
            tracing::warn!("Client error: {} - {} - Status code: {}", self.error_type(), self, status);
        }

        (status, Json(self.to_envelope())).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;
