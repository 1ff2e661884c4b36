//! Application configuration settings
//!
//! Defines all configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Model tried first when the caller does not request one
pub const DEFAULT_MODEL: &str = "google/gemini-3-flash";

/// Fallback order tried after the requested model
pub const DEFAULT_FALLBACK_MODELS: &[&str] = &[
    "google/gemini-3-flash",
    "google/gemini-3-pro",
    "google/gemini-2.5-flash",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream provider configuration
    pub upstream: UpstreamConfig,
    /// Candidate model configuration
    pub models: ModelsConfig,
    /// Request configuration
    pub request: RequestConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
}

/// Upstream completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API key
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Seconds to wait for the stream to open
    pub timeout: u64,
    /// Overall seconds for one streamed response
    pub stream_timeout: u64,
}

/// Candidate model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used when none is requested
    pub default_model: String,
    /// Ordered fallback list
    pub fallback: Vec<String>,
}

/// Request configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Maximum request size in bytes
    pub max_request_size: usize,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Allowed origins for CORS
    pub allowed_origins: Vec<String>,
    /// Whether CORS is enabled
    pub cors_enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (text/json)
    pub format: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            fallback: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Create a new configuration instance
    pub fn new() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .or_else(|_| std::env::var("SERVER_PORT"))
            .unwrap_or_else(|_| "5000".to_string());

        let fallback = match std::env::var("FALLBACK_MODELS") {
            Ok(list) => split_list(&list),
            Err(_) => ModelsConfig::default().fallback,
        };

        let settings = Self {
            server: ServerConfig {
                host: get_env_or_default("SERVER_HOST", "0.0.0.0"),
                port: port.parse().context("Invalid port number")?,
            },
            upstream: UpstreamConfig {
                api_key: std::env::var("OPENROUTER_API_KEY")
                    .context("OPENROUTER_API_KEY environment variable not set")?,
                base_url: get_env_or_default("UPSTREAM_BASE_URL", "https://openrouter.ai/api/v1"),
                timeout: get_env_or_default("UPSTREAM_TIMEOUT", "30")
                    .parse()
                    .context("Invalid upstream timeout value")?,
                stream_timeout: get_env_or_default("UPSTREAM_STREAM_TIMEOUT", "300")
                    .parse()
                    .context("Invalid upstream stream timeout value")?,
            },
            models: ModelsConfig {
                default_model: get_env_or_default("DEFAULT_MODEL", DEFAULT_MODEL),
                fallback,
            },
            request: RequestConfig {
                max_request_size: get_env_or_default("MAX_REQUEST_SIZE", "1048576")
                    .parse()
                    .context("Invalid maximum request size")?,
            },
            security: SecurityConfig {
                allowed_origins: split_list(&get_env_or_default("ALLOWED_ORIGINS", "*")),
                cors_enabled: get_env_or_default("CORS_ENABLED", "true")
                    .parse()
                    .context("Invalid CORS enabled flag")?,
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration validity
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.upstream.api_key.is_empty() {
            anyhow::bail!("Upstream API key cannot be empty");
        }

        if self.upstream.api_key.contains(char::is_whitespace) {
            anyhow::bail!("Upstream API key cannot contain whitespace characters");
        }

        if !self.upstream.base_url.starts_with("http") {
            anyhow::bail!("Invalid upstream base URL format, should start with 'http'");
        }

        if self.upstream.timeout == 0 || self.upstream.stream_timeout == 0 {
            anyhow::bail!("Timeout values cannot be 0");
        }

        if self.models.default_model.trim().is_empty() {
            anyhow::bail!("Default model cannot be empty");
        }

        if self.models.fallback.is_empty() {
            anyhow::bail!("Fallback model list cannot be empty");
        }

        if self.models.fallback.iter().any(|m| m.trim().is_empty()) {
            anyhow::bail!("Fallback model list cannot contain blank entries");
        }

        if self.request.max_request_size == 0 {
            anyhow::bail!("Maximum request size cannot be 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Settings pointing at a given upstream, for tests and embedding
    pub fn for_upstream(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            upstream: UpstreamConfig {
                api_key: api_key.into(),
                base_url: base_url.into(),
                timeout: 30,
                stream_timeout: 300,
            },
            models: ModelsConfig::default(),
            request: RequestConfig {
                max_request_size: 1024 * 1024,
            },
            security: SecurityConfig {
                allowed_origins: vec!["*".to_string()],
                cors_enabled: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

/// Get environment variable or default value
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Split a comma-separated list, dropping surrounding whitespace
fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}
