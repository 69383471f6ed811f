//! Upstream error types.

use thiserror::Error;

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Errors that can occur talking to the upstream platform.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// No valid credential could be obtained after a refresh/login attempt.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The upstream answered an ordinary call with a non-2xx status.
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] tbgw_models::ValidationError),
}

impl UpstreamError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, UpstreamError::Auth(_))
    }

    /// Message safe to surface to callers.
    ///
    /// Raw upstream bodies and transport detail leak backend internals, so
    /// outside of debug mode they are replaced with a generic condition.
    pub fn redacted_message(&self, debug: bool) -> String {
        if debug {
            return self.to_string();
        }
        match self {
            UpstreamError::Auth(_) => "Upstream authentication failed".to_string(),
            UpstreamError::Status { .. } | UpstreamError::Network(_) | UpstreamError::Json(_) => {
                "Upstream backend error".to_string()
            }
            UpstreamError::Config(_) => "Gateway misconfigured".to_string(),
            UpstreamError::Validation(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbgw_models::ValidationError;

    #[test]
    fn test_redaction_hides_upstream_body() {
        let err = UpstreamError::Status {
            status: 500,
            body: "stack trace with internals".to_string(),
        };
        assert_eq!(err.redacted_message(false), "Upstream backend error");
        assert!(err.redacted_message(true).contains("internals"));
    }

    #[test]
    fn test_validation_errors_pass_through() {
        let err = UpstreamError::from(ValidationError::EmptyKeys);
        assert_eq!(
            err.redacted_message(false),
            "at least one telemetry key is required"
        );
    }
}
