//! OpenAI-compatible chat completion models
//!
//! Only the subset the relay sends and reads

use serde::{Deserialize, Serialize};

/// Streaming chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model name
    pub model: String,
    /// Message list
    pub messages: Vec<ChatMessage>,
    /// Whether to stream response
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// Single user message, streamed
    pub fn user_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            stream: true,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role (system/user/assistant)
    pub role: String,
    /// Message content
    pub content: String,
}

/// Streaming response chunk
///
/// Providers behind OpenRouter disagree on which bookkeeping fields they
/// send, so everything except `choices` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    /// Response ID
    #[serde(default)]
    pub id: Option<String>,
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Choice list
    #[serde(default)]
    pub choices: Vec<ChatStreamChoice>,
    /// Mid-stream error reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderError>,
}

/// Streaming choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStreamChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Delta content
    #[serde(default)]
    pub delta: ChatStreamDelta,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Streaming delta
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStreamDelta {
    /// Role (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatStreamChunk {
    /// Incremental text at `choices[0].delta.content`, empty if absent
    pub fn content_delta(&self) -> &str {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .unwrap_or("")
    }

    /// Chunk carrying a single content delta
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatStreamChoice {
                delta: ChatStreamDelta {
                    role: None,
                    content: Some(content.into()),
                },
                ..Default::default()
            }],
            ..Default::default()
        }
    }
}

/// Provider error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderErrorResponse {
    /// Error information
    pub error: ProviderError,
}

/// Provider error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error message
    pub message: String,
    /// Error code (OpenRouter sends a number, OpenAI a string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}
