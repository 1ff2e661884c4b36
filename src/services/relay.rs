//! Relay service
//!
//! Picks the serving model, then forwards the upstream token stream as wire
//! events with provider control tokens removed.

use crate::config::settings::ModelsConfig;
use crate::models::openai::ChatStreamChunk;
use crate::models::{GenerationRequest, WireEvent};
use crate::providers::{BoxStream, Upstream, UpstreamError};
use crate::services::fallback::{candidate_models, first_available, Exhausted};
use crate::utils::error::{AppError, AppResult};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Control tokens some models leak into their output
const LEAKED_TOKENS: &[&str] = &["<s>", "</s>"];

/// Remove leaked control tokens from a delta
pub fn sanitize_delta(delta: &str) -> String {
    LEAKED_TOKENS
        .iter()
        .fold(delta.to_string(), |text, token| text.replace(token, ""))
}

/// Relay service
#[derive(Clone)]
pub struct RelayService {
    upstream: Arc<dyn Upstream>,
    models: ModelsConfig,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("upstream", &self.upstream.name())
            .field("models", &self.models)
            .finish()
    }
}

impl RelayService {
    pub fn new(upstream: Arc<dyn Upstream>, models: ModelsConfig) -> Self {
        Self { upstream, models }
    }

    /// Candidate order for a request
    pub fn candidates(&self, request: &GenerationRequest) -> Vec<String> {
        candidate_models(
            request.requested_model(),
            &self.models.default_model,
            &self.models.fallback,
        )
    }

    /// Open an upstream stream with the first candidate that accepts it
    ///
    /// Nothing has been written to the caller when this fails, so the error
    /// is still reportable with a status code.
    pub async fn open(&self, request: &GenerationRequest) -> AppResult<ActiveRelay> {
        let candidates = self.candidates(request);
        let prompt = request.prompt();
        let upstream = &self.upstream;

        let opened = first_available(&candidates, |model| async move {
            upstream.open_stream(&model, prompt).await
        })
        .await
        .map_err(exhausted_error)?;

        info!("Streaming with model: {} ({} candidates skipped)", opened.model, opened.skipped);

        Ok(ActiveRelay {
            model: opened.model,
            upstream: opened.value,
        })
    }
}

/// Map exhausted candidates to the error the caller sees
///
/// Only the last failure decides the kind; earlier ones are logged.
pub fn exhausted_error(exhausted: Exhausted<UpstreamError>) -> AppError {
    let summary: Vec<String> = exhausted
        .attempts
        .iter()
        .map(|attempt| format!("{}: {}", attempt.model, attempt.error))
        .collect();
    error!("All candidate models failed: [{}]", summary.join("; "));

    match exhausted.attempts.into_iter().last() {
        Some(last) if last.error.is_rate_limited() => AppError::RateLimited {
            detail: last.error.to_string(),
        },
        Some(last) => AppError::AllModelsExhausted {
            last: last.error.to_string(),
        },
        None => AppError::UpstreamFailure("no candidate models configured".to_string()),
    }
}

/// How a relay pump ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Upstream finished and the terminal event was sent
    Completed { deltas: usize },
    /// Receiver went away before the stream finished
    ClientGone { deltas: usize },
    /// Server-side cancellation (shutdown) stopped the stream
    Cancelled { deltas: usize },
    /// Upstream failed mid-stream; the response is closed without a terminal event
    UpstreamFailed { deltas: usize, error: UpstreamError },
}

/// An upstream stream that has been opened for one model
pub struct ActiveRelay {
    model: String,
    upstream: BoxStream<'static, ChatStreamChunk>,
}

impl std::fmt::Debug for ActiveRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRelay")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ActiveRelay {
    /// Model that accepted the request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forward upstream chunks as wire events until the stream ends
    ///
    /// Stops reading upstream as soon as the receiver is dropped or `cancel`
    /// fires; dropping `self.upstream` closes the provider connection.
    pub async fn pump(mut self, tx: mpsc::Sender<WireEvent>, cancel: CancellationToken) -> PumpOutcome {
        let mut deltas = 0;

        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    debug!("Client disconnected after {} deltas", deltas);
                    return PumpOutcome::ClientGone { deltas };
                }
                _ = cancel.cancelled() => {
                    debug!("Relay cancelled after {} deltas", deltas);
                    return PumpOutcome::Cancelled { deltas };
                }
                next = self.upstream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let delta = sanitize_delta(chunk.content_delta());
                    if delta.is_empty() {
                        continue;
                    }
                    if tx.send(WireEvent::ContentDelta(delta)).await.is_err() {
                        debug!("Client disconnected after {} deltas", deltas);
                        return PumpOutcome::ClientGone { deltas };
                    }
                    deltas += 1;
                }
                Some(Err(e)) => {
                    error!("Upstream stream failed for model {}: {}", self.model, e);
                    return PumpOutcome::UpstreamFailed { deltas, error: e };
                }
                None => break,
            }
        }

        if tx.send(WireEvent::Terminal).await.is_err() {
            return PumpOutcome::ClientGone { deltas };
        }

        debug!("Relay completed with {} deltas from {}", deltas, self.model);
        PumpOutcome::Completed { deltas }
    }
}
