//! Health check handlers
//!
//! Provides application health status check endpoints

use crate::handlers::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version information
    pub version: String,
    /// Timestamp
    pub timestamp: String,
    /// Details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

/// Check result
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthDetails {
    /// Model tried first when none is requested
    pub default_model: String,
    /// Number of configured fallback models
    pub fallback_models: usize,
    /// Uptime in seconds
    pub uptime_seconds: u64,
}

fn details(state: &AppState) -> HealthDetails {
    HealthDetails {
        default_model: state.settings.models.default_model.clone(),
        fallback_models: state.settings.models.fallback.len(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }
}

/// Basic health check
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Executing health check");

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "flowrelay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: Some(details(&state)),
    })
}

/// Liveness check
///
/// GET /health/live
/// Only confirms the process is serving; the upstream is not contacted
pub async fn liveness_check(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive".to_string(),
        service: "flowrelay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: None,
    })
}
