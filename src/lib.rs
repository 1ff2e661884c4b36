//! AI Flow Relay Library
//!
//! Streams AI completions from an OpenAI-compatible provider to clients as
//! `data:` events, falling back across an ordered model list, and provides the
//! matching stream consumer

pub mod client;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod services;
pub mod utils;

// Re-export common types
pub use client::{ConsumerError, ConsumerPhase, ResultSink, ResultView, StreamConsumer, StreamFolder};
pub use config::Settings;
pub use handlers::{create_router, create_router_with_upstream, AppState};
pub use models::{openai, GenerationRequest, WireEvent};
pub use providers::{OpenAICompatProvider, Upstream, UpstreamError};
pub use services::RelayService;
pub use utils::error::{AppError, AppResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
