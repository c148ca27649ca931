//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `CKPAY_` environment variable overrides.

use crate::remote::{Credential, GatewayConfig};
use crate::synthetic::{BaseMetrics, SyntheticConfig};
use crate::sync::SyncOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub synthetic: SyntheticSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    #[serde(default = "default_true")]
    pub fallback_to_synthetic: bool,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_transaction_limit")]
    pub transaction_limit: usize,
}

fn default_refresh_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_true() -> bool {
    true
}

fn default_retry_attempts() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    2_000
}

fn default_transaction_limit() -> usize {
    50
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            auto_refresh: true,
            fallback_to_synthetic: true,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            transaction_limit: default_transaction_limit(),
        }
    }
}

/// Canister gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_gateway_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_principal")]
    pub principal: String,

    pub token: Option<String>,

    /// Source to select on startup
    pub source: Option<String>,
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:4943".to_string()
}

fn default_request_timeout() -> u64 {
    10_000 // 10 seconds
}

fn default_principal() -> String {
    "2vxsx-fae".to_string()
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            request_timeout_ms: default_request_timeout(),
            principal: default_principal(),
            token: None,
            source: None,
        }
    }
}

/// Synthetic generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticSection {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_ms: u64,

    #[serde(default = "default_transaction_limit")]
    pub transaction_count: usize,
}

fn default_cache_ttl() -> u64 {
    30_000
}

impl Default for SyntheticSection {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_cache_ttl(),
            transaction_count: default_transaction_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("ckpay-dashboard").join("config.toml")),
            Some(PathBuf::from("/etc/ckpay-dashboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Gateway overrides
        if let Some(url) = lookup("CKPAY_GATEWAY_URL") {
            self.gateway.url = url;
        }
        if let Some(token) = lookup("CKPAY_GATEWAY_TOKEN") {
            self.gateway.token = Some(token);
        }
        if let Some(ms) = lookup("CKPAY_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.gateway.request_timeout_ms = ms;
        }

        // Sync overrides
        if let Some(ms) = lookup("CKPAY_REFRESH_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.sync.refresh_interval_ms = ms;
        }
        if let Some(enabled) = lookup("CKPAY_AUTO_REFRESH").and_then(|v| parse_flag(&v)) {
            self.sync.auto_refresh = enabled;
        }
        if let Some(enabled) = lookup("CKPAY_FALLBACK").and_then(|v| parse_flag(&v)) {
            self.sync.fallback_to_synthetic = enabled;
        }

        // Logging overrides
        if let Some(level) = lookup("CKPAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CKPAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Orchestrator options
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            refresh_interval: Duration::from_millis(self.sync.refresh_interval_ms),
            enable_auto_refresh: self.sync.auto_refresh,
            fallback_to_synthetic: self.sync.fallback_to_synthetic,
            retry_attempts: self.sync.retry_attempts,
            retry_delay: Duration::from_millis(self.sync.retry_delay_ms),
            request_timeout: Duration::from_millis(self.gateway.request_timeout_ms),
            transaction_limit: self.sync.transaction_limit,
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.gateway.url.clone(),
            request_timeout_ms: self.gateway.request_timeout_ms,
        }
    }

    pub fn credential(&self) -> Credential {
        let credential = Credential::new(self.gateway.principal.clone());
        match &self.gateway.token {
            Some(token) if !token.is_empty() => credential.with_token(token.clone()),
            _ => credential,
        }
    }

    pub fn synthetic_config(&self) -> SyntheticConfig {
        SyntheticConfig {
            cache_ttl_ms: self.synthetic.cache_ttl_ms,
            transaction_count: self.synthetic.transaction_count,
            base: BaseMetrics::default(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# ckPayment Dashboard Configuration
#
# Environment variables override these settings:
# - CKPAY_GATEWAY_URL
# - CKPAY_GATEWAY_TOKEN
# - CKPAY_REQUEST_TIMEOUT_MS
# - CKPAY_REFRESH_INTERVAL_MS
# - CKPAY_AUTO_REFRESH
# - CKPAY_FALLBACK
# - CKPAY_LOG_LEVEL
# - CKPAY_LOG_FORMAT

[sync]
# Auto-refresh period (ms)
refresh_interval_ms = 30000

# Refresh automatically while connected
auto_refresh = true

# Show synthetic data instead of an error when the backend is unreachable
fallback_to_synthetic = true

# Extra attempts after a failed cycle, and the pause between them (ms)
retry_attempts = 1
retry_delay_ms = 2000

# Number of recent transactions to fetch
transaction_limit = 50

[gateway]
# Canister gateway URL
url = "http://127.0.0.1:4943"

# Timeout for each remote call (ms)
request_timeout_ms = 10000

# Caller principal
principal = "2vxsx-fae"

# Optional bearer token
# token = ""

# Source to select on startup (defaults to the first one)
# source = "rdmx6-jaaaa-aaaaa-aaadq-cai"

[synthetic]
# How long generated data is reused (ms)
cache_ttl_ms = 30000

# Number of synthetic transactions
transaction_count = 50

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
