//! Thin authenticated HTTP wrapper over the upstream REST API.

use std::sync::Arc;

use reqwest::Response;
use serde_json::Value;

use crate::error::{UpstreamError, UpstreamResult};
use crate::session::SessionManager;

/// Injects a valid credential into every upstream call.
///
/// Credential staleness is handled transparently before the request goes
/// out; business-level 4xx/5xx responses are returned to the caller as-is,
/// never retried.
#[derive(Clone)]
pub struct UpstreamClient {
    session: Arc<SessionManager>,
}

impl UpstreamClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Authenticated GET returning the raw response (status + body).
    pub async fn get(&self, path: &str, params: &[(&str, String)]) -> UpstreamResult<Response> {
        let headers = self.session.authorized_headers().await?;
        let response = self
            .session
            .http()
            .get(self.session.url_for(path))
            .headers(headers)
            .query(params)
            .send()
            .await?;
        Ok(response)
    }

    /// Authenticated POST with a JSON body, returning the raw response.
    pub async fn post_json(&self, path: &str, body: &Value) -> UpstreamResult<Response> {
        let headers = self.session.authorized_headers().await?;
        let response = self
            .session
            .http()
            .post(self.session.url_for(path))
            .headers(headers)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    /// Authenticated GET that parses a 2xx JSON body, mapping any other
    /// status to an upstream error.
    pub async fn get_json(&self, path: &str, params: &[(&str, String)]) -> UpstreamResult<Value> {
        let response = self.get(path, params).await?;
        Self::expect_json(response).await
    }

    /// Check a response for success and parse the JSON body.
    pub async fn expect_json(response: Response) -> UpstreamResult<Value> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(UpstreamError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    /// Check a response for success, discarding the body.
    pub async fn expect_success(response: Response) -> UpstreamResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(UpstreamError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
