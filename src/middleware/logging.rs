//! Logging middleware
//!
//! Records HTTP request and response information

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request logging middleware
///
/// Tags each request with an id and logs status and time-to-headers. For
/// streamed responses the duration covers model selection only, not the
/// body.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
    );

    async move {
        info!(
            "Request started: {} {} - User-Agent: {}",
            method,
            uri,
            request
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
        );

        let mut response = next.run(request).await;

        let duration = start_time.elapsed();
        let status = response.status();

        if status.is_server_error() {
            warn!("Server error: {} - Duration: {:.2}ms", status, duration.as_secs_f64() * 1000.0);
        } else if status.is_client_error() {
            warn!("Client error: {} - Duration: {:.2}ms", status, duration.as_secs_f64() * 1000.0);
        } else {
            info!("Request completed: {} - Duration: {:.2}ms", status, duration.as_secs_f64() * 1000.0);
        }

        if duration.as_secs() > 5 {
            warn!("Slow request detected: {} {} - Duration: {:.2}s", method, uri, duration.as_secs_f64());
        }

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .instrument(span)
    .await
}
