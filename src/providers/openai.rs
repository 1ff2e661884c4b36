//! OpenAI-compatible provider implementation
//!
//! Speaks the `/chat/completions` streaming API (OpenRouter by default)

use super::{BoxStream, Upstream, UpstreamError};
use crate::config::settings::UpstreamConfig;
use crate::models::openai::{ChatCompletionRequest, ChatStreamChunk, ProviderErrorResponse};
use crate::utils::sse::DONE_MARKER;
use anyhow::{Context, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAICompatProvider {
    stream_client: Client,
    base_url: String,
    api_key: String,
    open_timeout: Duration,
}

impl OpenAICompatProvider {
    /// Create a provider from upstream settings
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let stream_client = Client::builder()
            .timeout(Duration::from_secs(config.stream_timeout))
            .user_agent(concat!("flowrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            stream_client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            open_timeout: Duration::from_secs(config.timeout),
        })
    }

    /// Build the request URL
    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Map a non-success response to an error, keeping the provider's message
    fn status_error(status: u16, body: &str) -> UpstreamError {
        let message = serde_json::from_str::<ProviderErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());

        if status == 429 {
            UpstreamError::RateLimited(message)
        } else {
            UpstreamError::Status { status, message }
        }
    }
}

#[async_trait]
impl Upstream for OpenAICompatProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn open_stream(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<BoxStream<'static, ChatStreamChunk>, UpstreamError> {
        debug!("Opening streaming chat completion for model: {}", model);

        let request = ChatCompletionRequest::user_prompt(model, prompt);

        let send = self.stream_client
            .post(self.build_url())
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&request)
            .send();

        let response = tokio::time::timeout(self.open_timeout, send)
            .await
            .map_err(|_| UpstreamError::Transport(format!("timed out after {:?} waiting for stream", self.open_timeout)))?
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status.as_u16(), &error_text));
        }

        Ok(Box::pin(sse_chunks(response.bytes_stream())))
    }
}

/// Turn an upstream SSE byte stream into parsed chunks
///
/// Event framing is handled by `eventsource-stream`. The stream ends at
/// `[DONE]`, at end of body, or after the first error.
pub fn sse_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatStreamChunk, UpstreamError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let events = Box::pin(bytes.eventsource());

    futures::stream::unfold(Some(events), |state| async move {
        let mut events = state?;

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => return Some((Err(UpstreamError::Transport(e.to_string())), None)),
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_MARKER {
                debug!("Received upstream end marker");
                return None;
            }

            match serde_json::from_str::<ChatStreamChunk>(data) {
                Ok(mut chunk) => match chunk.error.take() {
                    Some(error) => return Some((Err(UpstreamError::Stream(error.message)), None)),
                    None => return Some((Ok(chunk), Some(events))),
                },
                Err(e) => warn!("Failed to parse upstream chunk: {} - data: {}", e, data),
            }
        }

        None
    })
}
