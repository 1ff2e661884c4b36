//! Provider module
//!
//! Defines the `Upstream` trait and the OpenAI-compatible implementation

pub mod openai;

use crate::models::openai::ChatStreamChunk;
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// A boxed stream of upstream chunks
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T, UpstreamError>> + Send + 'a>>;

/// Failure to open or read an upstream stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Provider answered 429
    #[error("Upstream rate limit exceeded: {0}")]
    RateLimited(String),

    /// Provider answered with another non-success status
    #[error("Upstream request failed: {status} - {message}")]
    Status { status: u16, message: String },

    /// Connection, timeout or body read failure
    #[error("Upstream transport error: {0}")]
    Transport(String),

    /// Provider reported an error inside an already open stream
    #[error("Upstream stream error: {0}")]
    Stream(String),
}

impl UpstreamError {
    /// Whether the provider signalled quota or rate exhaustion
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, UpstreamError::RateLimited(_))
    }
}

/// Upstream completion provider
///
/// One call opens one streaming completion for one model. The relay owns the
/// returned stream for the lifetime of the attempt; dropping it closes the
/// underlying connection.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Open a streaming chat completion with `prompt` as the single user message
    async fn open_stream(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<BoxStream<'static, ChatStreamChunk>, UpstreamError>;
}

pub use openai::OpenAICompatProvider;
