//! Structural validation errors for caller-supplied payloads.
//!
//! These are raised before any upstream call is made.

use thiserror::Error;

/// Malformed caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("at least one telemetry key is required")]
    EmptyKeys,

    #[error("telemetry key cannot be blank")]
    BlankKey,

    #[error("start_ts ({start_ts}) must be less than end_ts ({end_ts})")]
    InvertedTimeRange { start_ts: i64, end_ts: i64 },

    #[error("limit must be at least 1")]
    ZeroLimit,

    #[error("aggregation interval must be at least 1 ms")]
    ZeroInterval,

    #[error("payload cannot be empty")]
    EmptyPayload,

    #[error("key '{0}' has no data points")]
    EmptyKeySeries(String),

    #[error("device id cannot be blank")]
    BlankDeviceId,
}
