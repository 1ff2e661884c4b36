//! AI relay handler
//!
//! POST /api/ask-ai: opens an upstream stream (with model fallback) and
//! relays it as `data:` events

use crate::handlers::AppState;
use crate::models::{AskAiBody, GenerationRequest, WireEvent};
use crate::utils::error::{AppError, AppResult};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// Response header naming the model that served the stream
pub const MODEL_USED_HEADER: HeaderName = HeaderName::from_static("x-model-used");

/// Buffered wire events between the pump task and the response body
const EVENT_BUFFER: usize = 100;

/// Handle relay requests
///
/// Validation and model selection errors are returned as JSON envelopes.
/// Once the stream response is returned its status is committed; a later
/// upstream failure only ends the body early.
pub async fn handle_ask_ai(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<AskAiBody>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = body.map_err(rejection_error)?;

    // Credential is accepted but not required here
    if headers.contains_key(header::AUTHORIZATION) {
        debug!("Request carries a bearer credential");
    }

    let request = GenerationRequest::try_from(body)?;
    debug!(
        "Received generation request: prompt_len={}, requested_model={:?}",
        request.prompt().len(),
        request.requested_model()
    );

    let active = state.relay.open(&request).await?;
    let model = active.model().to_string();

    let (tx, rx) = tokio::sync::mpsc::channel::<WireEvent>(EVENT_BUFFER);
    let cancel = state.shutdown.child_token();

    tokio::spawn(async move {
        let outcome = active.pump(tx, cancel).await;
        info!("Relay finished: {:?}", outcome);
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.encode()));
    Ok(event_stream_response(Body::from_stream(stream), &model))
}

/// Map an extractor rejection to the error envelope
///
/// A body cut off by the size limit surfaces as a buffering failure with
/// status 413; every other rejection is a malformed request.
fn rejection_error(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(rejection.body_text())
    }
}

/// Wrap a body in the long-lived event-stream response headers
fn event_stream_response(body: Body, model: &str) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(value) = HeaderValue::from_str(model) {
        headers.insert(MODEL_USED_HEADER, value);
    }

    response
}
