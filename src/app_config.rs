use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::language_utils::Language;
use crate::providers::lmstudio::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::translation::batch::DEFAULT_WINDOW_SIZE;
use crate::translation::cache::{CacheOptions, DEFAULT_MAX_BYTES, DEFAULT_TTL};
use crate::translation::concurrency::{DEFAULT_BACKOFF_MS, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};
use crate::translation::request::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, LanguagePair, TranslationParams,
};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// LM Studio client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Translation cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Windowing of large inputs
    #[serde(default)]
    pub batch: BatchConfig,
}

/// LM Studio client configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    // @field: Base URL of the OpenAI-compatible server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Bearer token, sent only when set
    #[serde(default)]
    pub api_key: Option<String>,

    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Completion token ceiling
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // @field: Per-attempt timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Retries after the first attempt
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ClientConfig {
    /// Per-request parameters derived from this configuration
    pub fn params(&self) -> TranslationParams {
        TranslationParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            model: self.model.clone(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            concurrent_requests: default_concurrent_requests(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Cache storage backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    // @backend: SQLite when it can be opened, memory otherwise
    #[default]
    Auto,
    // @backend: Process-local map
    Memory,
    // @backend: SQLite only
    Persistent,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Memory => "memory",
            Self::Persistent => "persistent",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "memory" => Ok(Self::Memory),
            "persistent" | "sqlite" => Ok(Self::Persistent),
            _ => Err(anyhow!("Invalid cache backend: {}", s)),
        }
    }
}

/// Translation cache configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Size budget in bytes
    #[serde(default = "default_cache_max_bytes")]
    pub max_bytes: u64,

    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Database file; the platform data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            max_bytes: self.max_bytes,
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            max_bytes: default_cache_max_bytes(),
            ttl_secs: default_cache_ttl_secs(),
            path: None,
        }
    }
}

/// Batch configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchConfig {
    /// Maximum segments per backend request
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_language() -> String {
    Language::En.code().to_string()
}

fn default_target_language() -> String {
    Language::Ja.code().to_string()
}

fn default_endpoint() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_concurrent_requests() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_retry_count() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS // doubled on each retry
}

fn default_cache_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

impl Config {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Resolve the configured languages into a pair
    pub fn lang_pair(&self) -> Result<LanguagePair> {
        LanguagePair::from_codes(&self.source_language, &self.target_language)
            .map_err(|e| anyhow!("Invalid language configuration: {}", e))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let pair = self.lang_pair()?;
        if pair.src == pair.dst {
            return Err(anyhow!(
                "Source and target language must differ (both are {})",
                pair.src.code()
            ));
        }

        Url::parse(&self.client.endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", self.client.endpoint))?;

        if self.client.model.trim().is_empty() {
            return Err(anyhow!("Model name must not be empty"));
        }
        if self.client.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if self.client.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be at least 1"));
        }
        if self.cache.max_bytes == 0 {
            return Err(anyhow!("Cache max_bytes must be positive"));
        }
        if self.batch.window_size == 0 {
            return Err(anyhow!("Batch window_size must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            log_level: LogLevel::default(),
            client: ClientConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}
