//! Relay client
//!
//! Posts a generation request and folds the event stream into a result.

use super::{ConsumerError, ResultSink, ResultView, StreamFolder, DEFAULT_FAILURE_MESSAGE};
use crate::models::GenerationRequest;
use futures::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Consumer of the relay's `/api/ask-ai` stream
#[derive(Debug, Clone)]
pub struct StreamConsumer {
    client: Client,
    endpoint: String,
    bearer: Option<String>,
}

impl StreamConsumer {
    /// Create a consumer for the given relay endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            bearer: None,
        }
    }

    /// Attach a bearer credential to every request
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one generation request to completion
    ///
    /// Publishes `Requesting`, then a `Streaming` view after every folded
    /// delta, then exactly one of `Done` or `Failed`. A stream that ends
    /// without the terminal event is still finalized as `Done`.
    pub async fn generate<S>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Result<String, ConsumerError>
    where
        S: ResultSink + ?Sized,
    {
        sink.publish(&ResultView::requesting());

        match self.stream(request, cancel, sink).await {
            Ok(text) => {
                info!("Generation finished: {} chars", text.len());
                sink.publish(&ResultView::done(text.clone()));
                Ok(text)
            }
            Err(e) => {
                warn!("Generation failed: {}", e);
                sink.publish(&ResultView::failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn stream<S>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Result<String, ConsumerError>
    where
        S: ResultSink + ?Sized,
    {
        let mut builder = self.client.post(&self.endpoint).json(&request.to_body());
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConsumerError::Cancelled),
            sent = builder.send() => sent?,
        };

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            return Err(ConsumerError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!(
            "Relay stream opened, model: {}",
            response
                .headers()
                .get("x-model-used")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
        );

        let mut body = Box::pin(response.bytes_stream());
        let mut folder = StreamFolder::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConsumerError::Cancelled),
                next = body.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    let step = folder.push_with(&bytes, |text| sink.publish(&ResultView::streaming(text)));
                    if step == super::FoldStep::Finished {
                        break;
                    }
                }
                Some(Err(e)) => return Err(ConsumerError::Transport(e)),
                None => {
                    debug!("Relay stream ended without terminal event");
                    break;
                }
            }
        }

        debug!("Folded {} deltas, skipped {} malformed", folder.deltas(), folder.malformed());
        Ok(folder.finish())
    }
}
