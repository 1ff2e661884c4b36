//! Service layer module
//!
//! Contains the model fallback policy and the streaming relay

pub mod fallback;
pub mod relay;

pub use fallback::{candidate_models, first_available, Exhausted, FailedAttempt, Opened};
pub use relay::{sanitize_delta, ActiveRelay, PumpOutcome, RelayService};
