//! Relay request and wire event models

use crate::utils::error::{AppError, AppResult};
use crate::utils::sse::{DATA_PREFIX, DONE_MARKER};
use serde::{Deserialize, Serialize};

/// Raw `POST /api/ask-ai` body
///
/// Both fields are optional at the serde level so a missing prompt is
/// reported through the regular validation envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskAiBody {
    /// Prompt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Requested model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A validated generation request, consumed once per submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    model: Option<String>,
}

impl GenerationRequest {
    /// Build a request, rejecting an empty prompt
    ///
    /// An empty model string is treated as "no model requested".
    pub fn new(prompt: impl Into<String>, model: Option<String>) -> AppResult<Self> {
        let prompt = prompt.into();
        if prompt.is_empty() {
            return Err(AppError::Validation("Prompt cannot be empty".to_string()));
        }

        let model = model.filter(|m| !m.is_empty());
        Ok(Self { prompt, model })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn requested_model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Body the consumer posts to the relay
    pub fn to_body(&self) -> AskAiBody {
        AskAiBody {
            prompt: Some(self.prompt.clone()),
            model: self.model.clone(),
        }
    }
}

impl TryFrom<AskAiBody> for GenerationRequest {
    type Error = AppError;

    fn try_from(body: AskAiBody) -> AppResult<Self> {
        let prompt = body
            .prompt
            .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;
        Self::new(prompt, body.model)
    }
}

/// Payload of a content delta event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPayload {
    pub content: String,
}

/// One unit of the streamed response framing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// Non-empty sanitized text fragment
    ContentDelta(String),
    /// End of stream
    Terminal,
}

impl WireEvent {
    /// Serialize to `data: <payload>\n\n`
    pub fn encode(&self) -> String {
        match self {
            WireEvent::ContentDelta(content) => {
                let payload = ContentPayload { content: content.clone() };
                // Serializing a single-string struct cannot fail
                let json = serde_json::to_string(&payload).unwrap_or_default();
                format!("{}{}\n\n", DATA_PREFIX, json)
            }
            WireEvent::Terminal => format!("{}{}\n\n", DATA_PREFIX, DONE_MARKER),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WireEvent::Terminal)
    }
}
