//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Configuration for [`crate::ScanGoClient`].
///
/// Custom `Debug` implementation redacts the `staff_token` field.
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL. Always ends with `/`.
    pub base_url: Url,
    /// Full staff bearer value, `{role}:{secret}`. Only staff routes use it.
    pub staff_token: Option<String>,
    /// Timeout for a single request.
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("staff_token", &self.staff_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with defaults for the given base URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            staff_token: None,
            timeout: Duration::from_secs(10),
        })
    }

    pub fn with_staff_token(mut self, token: impl Into<String>) -> Self {
        self.staff_token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SCANGO_API_URL` (default: `http://localhost:8080`)
    /// - `SCANGO_STAFF_TOKEN` (optional)
    pub fn from_env() -> Result<Self, ClientError> {
        let url = std::env::var("SCANGO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let mut config = Self::new(&url)?;
        if let Ok(token) = std::env::var("SCANGO_STAFF_TOKEN") {
            config = config.with_staff_token(token);
        }
        Ok(config)
    }
}
