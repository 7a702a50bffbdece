//! Backend connection configuration.

use clearaudit_core::defaults;
use clearaudit_core::{Error, Result};

/// Configuration for the HTTP backend client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the audit API.
    pub base_url: String,
    /// Bearer token sent on every request (optional for local backends).
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            api_token: None,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CLEARAUDIT_API_URL` | `http://localhost:8000` | Backend base URL |
    /// | `CLEARAUDIT_API_TOKEN` | unset | Bearer token |
    /// | `CLEARAUDIT_TIMEOUT_SECS` | `30` | Per-request timeout |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            base_url: std::env::var(defaults::ENV_API_URL)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| defaults::API_URL.to_string()),
            api_token: std::env::var(defaults::ENV_API_TOKEN)
                .ok()
                .filter(|v| !v.trim().is_empty()),
            timeout_seconds: defaults::env_or(
                defaults::ENV_TIMEOUT_SECS,
                defaults::REQUEST_TIMEOUT_SECS,
            ),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the bearer token.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }

    /// Check the configuration before building a client.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        Ok(())
    }

    /// Join an endpoint path onto the base URL.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim().trim_end_matches('/'), path)
    }
}
