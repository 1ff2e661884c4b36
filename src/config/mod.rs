//! Configuration management module
//!
//! Responsible for loading and managing application configuration from environment variables and `.env`

pub mod settings;

pub use settings::{LoggingConfig, ModelsConfig, Settings, UpstreamConfig};
