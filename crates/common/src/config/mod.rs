//! Configuration management for MasterForge
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// dblp endpoints and transport settings
    #[serde(default)]
    pub dblp: DblpConfig,

    /// Batch generation pacing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Artifact output locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Inbound rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Maximum protagonists accepted by one batch request
    #[serde(default = "default_max_batch_items")]
    pub max_batch_items: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DblpConfig {
    /// SPARQL endpoint URL
    #[serde(default = "default_sparql_endpoint")]
    pub sparql_endpoint: String,

    /// Author search API URL
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Maximum hits requested from the author search
    #[serde(default = "default_search_hits")]
    pub search_max_hits: u32,

    /// Transport timeout in seconds
    #[serde(default = "default_dblp_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Outbound queries per second during a batch
    #[serde(default = "default_batch_rps")]
    pub requests_per_second: u32,

    /// Maximum generations in flight at once
    #[serde(default = "default_batch_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory receiving .master and .meta.json files
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Write the metadata artifact next to each masterfile
    #[serde(default = "default_enabled")]
    pub write_metadata: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second accepted by the gateway
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_max_concurrent() -> usize { 32 }
fn default_max_batch_items() -> usize { 50 }
fn default_sparql_endpoint() -> String { crate::DEFAULT_SPARQL_ENDPOINT.to_string() }
fn default_search_endpoint() -> String { crate::DEFAULT_SEARCH_ENDPOINT.to_string() }
fn default_search_hits() -> u32 { 1000 }
fn default_dblp_timeout() -> u64 { 60 }
fn default_user_agent() -> String { format!("masterforge/{}", crate::VERSION) }
fn default_batch_rps() -> u32 { 1 }
fn default_batch_concurrency() -> usize { 1 }
fn default_output_dir() -> PathBuf { PathBuf::from("out") }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "masterforge".to_string() }
fn default_rate_limit() -> u32 { 10 }
fn default_burst() -> u32 { 20 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DBLP__TIMEOUT_SECS=90
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the dblp transport timeout as Duration
    pub fn dblp_timeout(&self) -> Duration {
        Duration::from_secs(self.dblp.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
            max_batch_items: default_max_batch_items(),
        }
    }
}

impl Default for DblpConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: default_sparql_endpoint(),
            search_endpoint: default_search_endpoint(),
            search_max_hits: default_search_hits(),
            timeout_secs: default_dblp_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_batch_rps(),
            concurrency: default_batch_concurrency(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            write_metadata: default_enabled(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            dblp: DblpConfig::default(),
            batch: BatchConfig::default(),
            output: OutputConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
