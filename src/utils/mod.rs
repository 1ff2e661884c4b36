//! Utilities module
//!
//! Contains error handling and event-stream decoding tools

pub mod error;
pub mod sse;
