use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Where the serverless backend lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Function base URL; endpoint paths are joined onto it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Publishable anonymous key, sent as a bearer token
    #[serde(default)]
    pub anon_key: String,

    /// Per-request timeout. `None` leaves the HTTP client's default in place.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Bounded retry schedule for failed autosaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Consecutive failures after which autosave gives up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_secs: default_initial_backoff_secs(),
            multiplier: default_multiplier(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `failures` consecutive failures
    ///
    /// `initial * multiplier^(failures - 1)`, capped at `max_backoff_secs`
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff_secs as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = secs.min(self.max_backoff_secs as f64).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// Whether `failures` consecutive failures exhaust the policy
    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts.max(1)
    }
}

/// Autosave coordinator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Timer period
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AutosaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Top-level configuration of the console
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub autosave: AutosaveConfig,

    /// Name recorded as the author of saves
    #[serde(default = "default_user")]
    pub user: String,

    /// Lifetime of cached page lists and global settings
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            anon_key: String::new(),
            request_timeout_secs: None,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            autosave: AutosaveConfig::default(),
            user: default_user(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("unreadable configuration: {}", e)))?;
        Ok(config)
    }

    /// Let `SEO_BACKEND_URL` and `SEO_ANON_KEY` override the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("SEO_BACKEND_URL").ok(),
            std::env::var("SEO_ANON_KEY").ok(),
        );
    }

    fn apply_overrides(&mut self, base_url: Option<String>, anon_key: Option<String>) {
        if let Some(url) = base_url.filter(|v| !v.is_empty()) {
            self.backend.base_url = url;
        }
        if let Some(key) = anon_key.filter(|v| !v.is_empty()) {
            self.backend.anon_key = key;
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:54321/functions/v1/server".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_secs() -> u64 {
    30
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_secs() -> u64 {
    600
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    30
}

fn default_user() -> String {
    "editor".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}
