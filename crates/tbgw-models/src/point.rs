//! Timestamped telemetry values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single telemetry reading: millisecond timestamp plus value.
///
/// Upstream values may be numbers, strings or booleans; they are carried
/// as JSON values end to end and never interpreted by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Timestamp in milliseconds since epoch.
    pub ts: i64,
    /// Telemetry value as reported by the upstream.
    pub value: Value,
}

impl DataPoint {
    pub fn new(ts: i64, value: impl Into<Value>) -> Self {
        Self {
            ts,
            value: value.into(),
        }
    }

    /// Render the value as a plain cell string (no JSON quoting for strings).
    pub fn value_as_cell(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
