use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

/// Upper bound for transport retries on rate limits and server errors
pub const MAX_RETRY_COUNT: u32 = 10;

/// Application configuration module
/// Settings come from three layers: command-line flags, an optional JSON
/// file and the defaults below. The binary merges them; this module only
/// knows how to load, default and validate the result.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language: an ISO 639 code or a free-text language name
    #[serde(default)]
    pub target_language: String,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier passed through to the endpoint
    #[serde(default)]
    pub model: String,

    /// Credential, empty for local servers
    #[serde(default)]
    pub api_key: String,

    /// Number of entries per request
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Free-text hints embedded in every prompt
    #[serde(default)]
    pub context: String,

    /// Request tuning
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Request tuning shared by every window
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Sampling temperature, kept low for stable output
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Request/parse cycles per window before falling back to source text
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Transport-level retries for rate limits and server errors
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for transport retries (in milliseconds), doubled per retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_window_size() -> usize {
    4
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    crate::translation::retry::MAX_ATTEMPTS
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

impl Config {
    /// Load a configuration file. Missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Parsed endpoint base URL, without a trailing slash
    pub fn endpoint_url(&self) -> Result<Url> {
        let trimmed = self.endpoint.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|e| anyhow!("Malformed endpoint URL '{}': {}", self.endpoint, e))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("Unsupported endpoint scheme '{}' in '{}'", other, self.endpoint)),
        }
        if url.host_str().is_none() {
            return Err(anyhow!("Endpoint URL has no host: {}", self.endpoint));
        }

        Ok(url)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language is required"));
        }

        if self.model.trim().is_empty() {
            return Err(anyhow!("Model identifier is required"));
        }

        if self.window_size == 0 {
            return Err(anyhow!("Window size must be at least 1"));
        }

        self.endpoint_url()?;

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.translation.temperature
            ));
        }

        if self.translation.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }

        if self.translation.retry_count > MAX_RETRY_COUNT {
            return Err(anyhow!(
                "retry_count must be at most {}, got {}",
                MAX_RETRY_COUNT,
                self.translation.retry_count
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: String::new(),
            endpoint: default_endpoint(),
            model: String::new(),
            api_key: String::new(),
            window_size: default_window_size(),
            context: String::new(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
