//! HTTP handlers module
//!
//! Contains all HTTP endpoint handling logic

pub mod ask;
pub mod health;

use crate::config::Settings;
use crate::middleware::logging::request_logging_middleware;
use crate::providers::{OpenAICompatProvider, Upstream};
use crate::services::RelayService;
use crate::utils::error::{AppError, AppResult};
use axum::{
    http::{HeaderValue, Uri},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: Settings,
    pub relay: RelayService,
    /// Cancelled on shutdown; every active relay holds a child token
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}

/// Create application router backed by the configured upstream provider
pub async fn create_router(settings: Settings, shutdown: CancellationToken) -> AppResult<Router> {
    let upstream = Arc::new(OpenAICompatProvider::new(&settings.upstream).map_err(AppError::Config)?);
    Ok(create_router_with_upstream(settings, upstream, shutdown))
}

/// Create application router with an explicit upstream (tests substitute a fake)
pub fn create_router_with_upstream(
    settings: Settings,
    upstream: Arc<dyn Upstream>,
    shutdown: CancellationToken,
) -> Router {
    let relay = RelayService::new(upstream, settings.models.clone());

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        relay,
        shutdown,
        started_at: Instant::now(),
    });

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(RequestBodyLimitLayer::new(settings.request.max_request_size));

    let router = Router::new()
        .route("/", get(root))
        .route("/api/ask-ai", post(ask::handle_ask_ai))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness_check))
        .fallback(not_found)
        .with_state(app_state)
        .layer(middleware_stack);

    if settings.security.cors_enabled {
        router.layer(cors_layer(&settings.security.allowed_origins))
    } else {
        router
    }
}

/// Build the CORS layer from the configured origins
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

/// GET /
async fn root() -> &'static str {
    "AI Flow API is running"
}

/// Unknown route
async fn not_found(uri: Uri) -> AppError {
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    AppError::NotFound(path)
}
