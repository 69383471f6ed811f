//! Shared upstream session.
//!
//! One `SessionManager` instance owns the process-wide login: it performs
//! the initial authentication, refreshes the access token before expiry,
//! and collapses concurrent refresh attempts into a single upstream call.
//! Construct it explicitly and share it via `Arc`; there is no hidden
//! global instance.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::token_store::TokenStore;

/// Header the upstream expects the bearer token in.
const AUTH_HEADER: HeaderName = HeaderName::from_static("x-authorization");

/// Token pair returned by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
struct TokenPair {
    token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

/// Owns the login/refresh protocol against the upstream auth endpoints.
///
/// The refresh lock serializes only the refresh/login network round-trip;
/// ordinary authorized requests proceed without it.
pub struct SessionManager {
    http: Client,
    config: UpstreamConfig,
    store: TokenStore,
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    /// Create a session manager with a tuned HTTP client.
    ///
    /// A non-TLS base URL disables certificate verification and logs a
    /// loud warning; this is a development-mode escape hatch only.
    pub fn new(config: UpstreamConfig) -> UpstreamResult<Self> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("tbgw-upstream/", env!("CARGO_PKG_VERSION")));

        if !config.is_secure() {
            warn!(
                base_url = %config.base_url,
                "upstream base URL is not HTTPS - TLS certificate verification disabled (dev mode)"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(UpstreamError::Network)?;
        let store = TokenStore::new(config.refresh_guard);

        Ok(Self {
            http,
            config,
            store,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> UpstreamResult<Self> {
        Self::new(UpstreamConfig::from_env()?)
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Shared pooled HTTP client for upstream calls.
    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Absolute URL for an upstream path.
    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url_trimmed(), path)
    }

    /// Full login with the configured credentials, populating the store.
    pub async fn login(&self) -> UpstreamResult<()> {
        let url = self.url_for("/api/auth/login");
        let payload = json!({
            "username": self.config.username,
            "password": self.config.password,
        });

        let response = self.http.post(&url).json(&payload).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Auth(format!(
                "login failed ({status}): {body}"
            )));
        }

        let tokens: TokenPair = response.json().await?;
        self.store.update(tokens.token, tokens.refresh_token).await;
        info!(username = %self.config.username, "authenticated against upstream");
        Ok(())
    }

    /// Refresh the access token, collapsing concurrent callers into one
    /// upstream call.
    ///
    /// An expired or rejected refresh token is routine and recoverable, so
    /// any HTTP-level failure on the refresh endpoint falls back to a full
    /// login instead of propagating.
    pub async fn refresh(&self) -> UpstreamResult<()> {
        let _serialized = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited on the lock.
        if self.store.valid_access().await.is_some() {
            return Ok(());
        }

        let Some(refresh_token) = self.store.refresh_credential().await else {
            // No tokens at all yet.
            return self.login().await;
        };

        let url = self.url_for("/api/auth/token");
        let payload = json!({ "refreshToken": refresh_token });

        match self.http.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                let tokens: TokenPair = response.json().await?;
                self.store.update(tokens.token, tokens.refresh_token).await;
                debug!("refreshed upstream access token");
                Ok(())
            }
            Ok(response) => {
                warn!(
                    status = response.status().as_u16(),
                    "token refresh rejected, falling back to full login"
                );
                self.login().await
            }
            Err(e) => {
                warn!("token refresh failed ({e}), falling back to full login");
                self.login().await
            }
        }
    }

    /// Headers carrying a valid access token, refreshing first when the
    /// stored credential is stale.
    pub async fn authorized_headers(&self) -> UpstreamResult<HeaderMap> {
        if let Some(token) = self.store.valid_access().await {
            return bearer_headers(&token);
        }

        self.refresh().await?;

        match self.store.valid_access().await {
            Some(token) => bearer_headers(&token),
            None => Err(UpstreamError::auth("unable to obtain a valid access token")),
        }
    }

    /// Drop the stored credential.
    pub async fn close(&self) {
        self.store.clear().await;
    }
}

fn bearer_headers(token: &str) -> UpstreamResult<HeaderMap> {
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| UpstreamError::auth("access token is not a valid header value"))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTH_HEADER, value);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header_shape() {
        let headers = bearer_headers("abc.def.ghi").unwrap();
        assert_eq!(
            headers.get("x-authorization").unwrap().to_str().unwrap(),
            "Bearer abc.def.ghi"
        );
    }

    #[test]
    fn test_bearer_header_rejects_control_chars() {
        assert!(bearer_headers("bad\ntoken").is_err());
    }

    #[test]
    fn test_url_joining_handles_trailing_slash() {
        let config =
            UpstreamConfig::new("http://localhost:8080/", "tenant", "secret").unwrap();
        let session = SessionManager::new(config).unwrap();
        assert_eq!(
            session.url_for("/api/auth/login"),
            "http://localhost:8080/api/auth/login"
        );
    }
}
