//! Telemetry pagination and upload operations.
//!
//! The upstream caps every timeseries read at a fixed number of points per
//! key per call. `TelemetryReader` drives repeated calls to assemble the
//! full requested range, and carries the upload paths for single-device
//! and bulk writes.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tbgw_models::{
    AggregatedSeries, AttributeScope, AttributesUpload, BulkUpload, BulkUploadReport, DataPoint,
    SeriesQuery, TelemetryUpload, ValidationError,
};

use crate::client::UpstreamClient;
use crate::error::UpstreamResult;

/// Default read window when the query carries no time bounds.
const DEFAULT_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Most recent value per requested key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    /// Most recent timestamp across all returned keys (0 when no data).
    pub timestamp: i64,
    /// Latest point per key; `None` for keys with no upstream data.
    pub values: BTreeMap<String, Option<DataPoint>>,
}

/// Assembles time-bounded series across the upstream's per-call cap.
pub struct TelemetryReader {
    client: UpstreamClient,
}

impl TelemetryReader {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Fetch the full series for every key in the query.
    ///
    /// Keys are read independently and sequentially; within a key, pages
    /// are strictly time-ordered (each page starts at the prior page's
    /// last timestamp + 1, so boundary points are never re-fetched). A key
    /// with no data yields an empty sequence. Any upstream failure aborts
    /// the whole query; no partial result is returned.
    pub async fn fetch_series(
        &self,
        device_id: &str,
        query: &SeriesQuery,
    ) -> UpstreamResult<AggregatedSeries> {
        check_device_id(device_id)?;

        let end_ts = query.end_ts().unwrap_or_else(|| Utc::now().timestamp_millis());
        let start_ts = query.start_ts().unwrap_or(end_ts - DEFAULT_WINDOW_MS);
        if start_ts >= end_ts {
            return Err(ValidationError::InvertedTimeRange { start_ts, end_ts }.into());
        }

        let path = timeseries_path(device_id);
        let cap = self.client.session().config().page_limit as usize;
        let per_key_limit = query.limit().map(|l| l as usize);

        let mut aggregated = AggregatedSeries::new();
        for key in query.keys() {
            aggregated.insert_key(key);

            let mut cursor = start_ts;
            let mut fetched = 0usize;
            loop {
                let mut params = vec![
                    ("keys", key.to_string()),
                    ("startTs", cursor.to_string()),
                    ("endTs", end_ts.to_string()),
                    ("limit", cap.to_string()),
                ];
                if let Some(interval) = query.interval_ms() {
                    params.push(("interval", interval.to_string()));
                    params.push(("agg", "AVG".to_string()));
                }

                let body = self.client.get_json(&path, &params).await?;
                let chunk: Vec<DataPoint> = match body.get(key.as_str()) {
                    Some(points) => serde_json::from_value(points.clone())?,
                    None => Vec::new(),
                };

                // Empty chunk: no more data in range.
                let Some(last) = chunk.last() else { break };
                let last_ts = last.ts;
                let chunk_len = chunk.len();

                fetched += chunk_len;
                aggregated.extend_key(key, chunk);

                if let Some(limit) = per_key_limit {
                    if fetched >= limit {
                        aggregated.truncate_key(key, limit);
                        break;
                    }
                }
                // Fewer than the cap means the last page.
                if chunk_len < cap {
                    break;
                }
                cursor = last_ts + 1;
            }

            debug!(device_id, key = key.as_str(), points = fetched, "fetched series for key");
        }

        Ok(aggregated)
    }

    /// Latest value per key, in a single upstream call.
    ///
    /// The upstream returns unranged reads most-recent-first, so the first
    /// point per key is the latest one.
    pub async fn fetch_latest(
        &self,
        device_id: &str,
        keys: &[String],
    ) -> UpstreamResult<LatestSnapshot> {
        check_device_id(device_id)?;
        let query = SeriesQuery::new(keys.iter().cloned())?;

        let params = vec![("keys", query.keys().join(","))];
        let body = self
            .client
            .get_json(&timeseries_path(device_id), &params)
            .await?;

        let mut values = BTreeMap::new();
        let mut timestamp = 0i64;
        for key in query.keys() {
            let latest: Option<DataPoint> = match body.get(key.as_str()) {
                Some(points) => serde_json::from_value::<Vec<DataPoint>>(points.clone())?
                    .into_iter()
                    .next(),
                None => None,
            };
            if let Some(point) = &latest {
                timestamp = timestamp.max(point.ts);
            }
            values.insert(key.clone(), latest);
        }

        Ok(LatestSnapshot { timestamp, values })
    }

    /// Keys with stored timeseries data for a device.
    pub async fn list_keys(&self, device_id: &str) -> UpstreamResult<Vec<String>> {
        check_device_id(device_id)?;
        let path = format!("/api/plugins/telemetry/DEVICE/{device_id}/keys/timeseries");
        let body = self.client.get_json(&path, &[]).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Upload timestamped telemetry to one device.
    pub async fn upload(&self, device_id: &str, upload: &TelemetryUpload) -> UpstreamResult<()> {
        check_device_id(device_id)?;
        let path = format!("/api/plugins/telemetry/DEVICE/{device_id}/timeseries/any");
        let response = self.client.post_json(&path, &upload.to_wire()).await?;
        UpstreamClient::expect_success(response).await?;
        info!(
            device_id,
            total_points = upload.total_points(),
            "uploaded telemetry"
        );
        Ok(())
    }

    /// Upload attributes to one device in the given scope.
    pub async fn upload_attributes(
        &self,
        device_id: &str,
        scope: AttributeScope,
        attributes: &AttributesUpload,
    ) -> UpstreamResult<()> {
        check_device_id(device_id)?;
        let path = format!(
            "/api/plugins/telemetry/DEVICE/{device_id}/attributes/{}",
            scope.as_str()
        );
        let response = self.client.post_json(&path, &attributes.to_wire()).await?;
        UpstreamClient::expect_success(response).await?;
        info!(device_id, count = attributes.len(), scope = scope.as_str(), "uploaded attributes");
        Ok(())
    }

    /// Upload telemetry to several devices, best-effort per device.
    ///
    /// Ordinary upstream failures are recorded per device and the batch
    /// continues; an authentication failure aborts the whole batch since
    /// no remaining device could succeed without a session.
    pub async fn bulk_upload(&self, bulk: &BulkUpload) -> UpstreamResult<BulkUploadReport> {
        let mut report = BulkUploadReport::default();

        for (device_id, upload) in bulk.iter() {
            match self.upload(device_id, upload).await {
                Ok(()) => {
                    let keys = upload.keys().map(str::to_string).collect();
                    report.record_success(device_id, keys, upload.total_points());
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => report.record_failure(device_id, e.to_string()),
            }
        }

        info!(
            devices = report.total_devices,
            failed = report.failed_devices,
            "bulk upload completed"
        );
        Ok(report)
    }
}

fn timeseries_path(device_id: &str) -> String {
    format!("/api/plugins/telemetry/DEVICE/{device_id}/values/timeseries")
}

fn check_device_id(device_id: &str) -> Result<(), ValidationError> {
    if device_id.trim().is_empty() {
        return Err(ValidationError::BlankDeviceId);
    }
    Ok(())
}
