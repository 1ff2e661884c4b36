//! Data models module
//!
//! Defines relay request/event structures and the upstream chat-completion API

use serde::{Deserialize, Serialize};

pub mod openai;
pub mod relay;

pub use relay::{AskAiBody, GenerationRequest, WireEvent};

/// JSON response envelope shared by every non-streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// "success" for 2xx responses, "fail" otherwise
    pub status: String,
    /// Human readable message
    pub message: String,
    /// Payload (null on failure)
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Failure envelope, `data` is always null
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail".to_string(),
            message: message.into(),
            data: None,
        }
    }
}
