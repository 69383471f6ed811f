//! Upstream connection configuration.

use std::time::Duration;

use url::Url;

use crate::error::{UpstreamError, UpstreamResult};

/// Connection settings for the upstream device-management platform.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream REST API.
    pub base_url: String,
    /// Tenant login username.
    pub username: String,
    /// Tenant login password.
    pub password: String,
    /// Safety margin subtracted from token expiry to trigger proactive refresh.
    pub refresh_guard: Duration,
    /// Per-call request timeout.
    pub request_timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Maximum points the upstream returns per key per call.
    pub page_limit: u32,
    /// Surface raw upstream error bodies to callers.
    pub debug: bool,
}

impl UpstreamConfig {
    /// Create a config with the standard defaults for the remaining knobs.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> UpstreamResult<Self> {
        let config = Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            refresh_guard: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            page_limit: tbgw_models::MAX_PAGE_LIMIT,
            debug: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config from environment variables.
    pub fn from_env() -> UpstreamResult<Self> {
        let base_url = std::env::var("TB_HOST")
            .map_err(|_| UpstreamError::config("TB_HOST must be set to the upstream base URL"))?;
        let username = std::env::var("TB_USERNAME")
            .map_err(|_| UpstreamError::config("TB_USERNAME must be set"))?;
        let password = std::env::var("TB_PASSWORD")
            .map_err(|_| UpstreamError::config("TB_PASSWORD must be set"))?;

        let refresh_guard_secs: u64 = std::env::var("TB_REFRESH_GUARD_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let request_timeout_secs: u64 = std::env::var("TB_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let connect_timeout_secs: u64 = std::env::var("TB_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        let debug = std::env::var("TB_DEBUG")
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let config = Self {
            base_url,
            username,
            password,
            refresh_guard: Duration::from_secs(refresh_guard_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            page_limit: tbgw_models::MAX_PAGE_LIMIT,
            debug,
        };
        config.validate()?;
        Ok(config)
    }

    /// True when the upstream URL uses TLS. Non-secure schemes are a
    /// development-mode escape hatch, never the default.
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn validate(&self) -> UpstreamResult<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(UpstreamError::config(
                "upstream credentials cannot be empty",
            ));
        }
        let url = Url::parse(&self.base_url)
            .map_err(|e| UpstreamError::config(format!("invalid TB_HOST '{}': {}", self.base_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(UpstreamError::config(format!(
                "unsupported TB_HOST scheme '{}'",
                other
            ))),
        }
    }
}
