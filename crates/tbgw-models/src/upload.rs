//! Upload payloads for telemetry and attributes.
//!
//! The upstream accepts open-ended key sets; these types represent them as
//! explicit ordered maps validated structurally, rather than dynamic
//! attribute bags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::point::DataPoint;

/// Attribute scope understood by the upstream platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeScope {
    ServerScope,
    SharedScope,
}

impl AttributeScope {
    /// Path segment used by the upstream attributes endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeScope::ServerScope => "SERVER_SCOPE",
            AttributeScope::SharedScope => "SHARED_SCOPE",
        }
    }
}

/// Timestamped telemetry for one device, mapped by key name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryUpload {
    keys: BTreeMap<String, Vec<DataPoint>>,
}

impl TelemetryUpload {
    /// Validate an upload: non-empty, no blank keys, every key carries at
    /// least one point.
    pub fn new(keys: BTreeMap<String, Vec<DataPoint>>) -> Result<Self, ValidationError> {
        if keys.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }
        for (key, points) in &keys {
            if key.trim().is_empty() {
                return Err(ValidationError::BlankKey);
            }
            if points.is_empty() {
                return Err(ValidationError::EmptyKeySeries(key.clone()));
            }
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(|k| k.as_str())
    }

    pub fn total_points(&self) -> usize {
        self.keys.values().map(Vec::len).sum()
    }

    /// Wire payload for the upstream timeseries endpoint.
    pub fn to_wire(&self) -> Value {
        serde_json::to_value(&self.keys).unwrap_or(Value::Null)
    }
}

/// Key/value attributes for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributesUpload {
    attributes: BTreeMap<String, Value>,
}

impl AttributesUpload {
    pub fn new(attributes: BTreeMap<String, Value>) -> Result<Self, ValidationError> {
        if attributes.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }
        if attributes.keys().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::BlankKey);
        }
        Ok(Self { attributes })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn to_wire(&self) -> Value {
        serde_json::to_value(&self.attributes).unwrap_or(Value::Null)
    }
}

/// Telemetry uploads for several devices at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkUpload {
    devices: BTreeMap<String, TelemetryUpload>,
}

impl BulkUpload {
    pub fn new(devices: BTreeMap<String, TelemetryUpload>) -> Result<Self, ValidationError> {
        if devices.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }
        if devices.keys().any(|d| d.trim().is_empty()) {
            return Err(ValidationError::BlankDeviceId);
        }
        Ok(Self { devices })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TelemetryUpload)> {
        self.devices.iter().map(|(d, u)| (d.as_str(), u))
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

/// Outcome of one device's upload within a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceUploadOutcome {
    Success {
        keys_uploaded: Vec<String>,
        data_points: usize,
    },
    Failed {
        error: String,
    },
}

/// Per-device results plus summary counters for a bulk upload.
///
/// Bulk uploads are best-effort per device; a failure on one device does
/// not prevent uploads to the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUploadReport {
    pub results: BTreeMap<String, DeviceUploadOutcome>,
    pub total_devices: usize,
    pub successful_devices: usize,
    pub failed_devices: usize,
    pub total_data_points: usize,
}

impl BulkUploadReport {
    pub fn record_success(&mut self, device_id: &str, keys: Vec<String>, points: usize) {
        self.results.insert(
            device_id.to_string(),
            DeviceUploadOutcome::Success {
                keys_uploaded: keys,
                data_points: points,
            },
        );
        self.total_devices += 1;
        self.successful_devices += 1;
        self.total_data_points += points;
    }

    pub fn record_failure(&mut self, device_id: &str, error: impl Into<String>) {
        self.results.insert(
            device_id.to_string(),
            DeviceUploadOutcome::Failed {
                error: error.into(),
            },
        );
        self.total_devices += 1;
        self.failed_devices += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_upload() -> TelemetryUpload {
        let mut keys = BTreeMap::new();
        keys.insert(
            "temperature".to_string(),
            vec![DataPoint::new(1_609_459_200_000, 25.6)],
        );
        TelemetryUpload::new(keys).unwrap()
    }

    #[test]
    fn test_telemetry_upload_rejects_empty() {
        assert_eq!(
            TelemetryUpload::new(BTreeMap::new()).unwrap_err(),
            ValidationError::EmptyPayload
        );
    }

    #[test]
    fn test_telemetry_upload_rejects_empty_key_series() {
        let mut keys = BTreeMap::new();
        keys.insert("humidity".to_string(), vec![]);
        assert_eq!(
            TelemetryUpload::new(keys).unwrap_err(),
            ValidationError::EmptyKeySeries("humidity".to_string())
        );
    }

    #[test]
    fn test_telemetry_upload_wire_shape() {
        let wire = sample_upload().to_wire();
        assert_eq!(wire["temperature"][0]["value"], json!(25.6));
    }

    #[test]
    fn test_attribute_scope_path_segment() {
        assert_eq!(AttributeScope::ServerScope.as_str(), "SERVER_SCOPE");
        assert_eq!(AttributeScope::SharedScope.as_str(), "SHARED_SCOPE");
    }

    #[test]
    fn test_bulk_report_counters() {
        let mut report = BulkUploadReport::default();
        report.record_success("dev-1", vec!["temperature".to_string()], 3);
        report.record_failure("dev-2", "upstream error");
        assert_eq!(report.total_devices, 2);
        assert_eq!(report.successful_devices, 1);
        assert_eq!(report.failed_devices, 1);
        assert_eq!(report.total_data_points, 3);
        assert!(matches!(
            report.results["dev-2"],
            DeviceUploadOutcome::Failed { .. }
        ));
    }
}
