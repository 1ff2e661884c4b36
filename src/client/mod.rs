//! Stream consumer
//!
//! Client side of the relay: posts a prompt, reassembles the `data:` event
//! stream and publishes the growing result after every content delta.

pub mod consumer;
pub mod folder;

pub use consumer::StreamConsumer;
pub use folder::{FoldStep, StreamFolder};

use thiserror::Error;
use tokio::sync::watch;

/// Fallback message when a rejected response carries no readable message
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to fetch";

/// Per-request consumer state
///
/// `Idle -> Requesting -> (Failed | Streaming) -> (Done | Failed)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumerPhase {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Done,
    Failed,
}

impl ConsumerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConsumerPhase::Done | ConsumerPhase::Failed)
    }
}

/// What the display layer renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultView {
    /// Accumulated text, or the error message once failed
    pub text: String,
    pub in_progress: bool,
    pub phase: ConsumerPhase,
}

impl ResultView {
    pub fn requesting() -> Self {
        Self {
            text: String::new(),
            in_progress: true,
            phase: ConsumerPhase::Requesting,
        }
    }

    pub fn streaming(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            in_progress: true,
            phase: ConsumerPhase::Streaming,
        }
    }

    pub fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            in_progress: false,
            phase: ConsumerPhase::Done,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            in_progress: false,
            phase: ConsumerPhase::Failed,
        }
    }
}

/// Receiver of result updates
pub trait ResultSink {
    fn publish(&mut self, view: &ResultView);
}

impl<F> ResultSink for F
where
    F: FnMut(&ResultView),
{
    fn publish(&mut self, view: &ResultView) {
        self(view)
    }
}

impl ResultSink for watch::Sender<ResultView> {
    fn publish(&mut self, view: &ResultView) {
        self.send_replace(view.clone());
    }
}

/// Request-level consumer failure
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Relay answered with a non-success status before streaming
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Network or body read failure
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Caller aborted the request
    #[error("Request cancelled")]
    Cancelled,
}
