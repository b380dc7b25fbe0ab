//! Ledger gateway client configuration.
//!
//! Override via environment variables or explicit construction for tests.

use std::time::Duration;

use url::Url;

/// Backoff schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. The default of 2 gives three
    /// attempts in all.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Configuration for the ledger gateway.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct ChainConfig {
    /// Gateway base URL. Always ends with `/`.
    pub gateway_url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Upper bound on one operation including all retries.
    pub call_deadline: Duration,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("gateway_url", &self.gateway_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("call_deadline", &self.call_deadline)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ChainConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SCANGO_CHAIN_URL` (required)
    /// - `SCANGO_CHAIN_TOKEN` (optional)
    /// - `SCANGO_CHAIN_TIMEOUT_MS` (default: 1000)
    /// - `SCANGO_CHAIN_DEADLINE_MS` (default: 2500)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("SCANGO_CHAIN_URL").map_err(|_| ConfigError::MissingUrl)?;
        let mut config = Self::new(&raw)?;
        config.api_token = std::env::var("SCANGO_CHAIN_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        config.request_timeout = Duration::from_millis(env_u64("SCANGO_CHAIN_TIMEOUT_MS", 1000));
        config.call_deadline = Duration::from_millis(env_u64("SCANGO_CHAIN_DEADLINE_MS", 2500));
        Ok(config)
    }

    /// Configuration with defaults for the given gateway URL.
    pub fn new(gateway_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway_url: normalize_base(gateway_url)?,
            api_token: None,
            request_timeout: Duration::from_millis(1000),
            call_deadline: Duration::from_millis(2500),
            retry: RetryPolicy::default(),
        })
    }
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn normalize_base(raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SCANGO_CHAIN_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL {0}: {1}")]
    InvalidUrl(String, String),
}
