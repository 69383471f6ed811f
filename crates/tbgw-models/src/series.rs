//! Series queries and aggregated results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::point::DataPoint;

/// The upstream never returns more than this many points per key per call.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// A validated, immutable request for a time-bounded multi-key series.
///
/// Built once per incoming request; the pagination engine reads it but
/// never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    keys: Vec<String>,
    start_ts: Option<i64>,
    end_ts: Option<i64>,
    limit: Option<u32>,
    interval_ms: Option<i64>,
}

impl SeriesQuery {
    /// Create a query for the given keys. Keys must be non-empty and
    /// non-blank; duplicates are dropped, preserving first occurrence.
    pub fn new<I, S>(keys: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if key.trim().is_empty() {
                return Err(ValidationError::BlankKey);
            }
            if !seen.contains(&key) {
                seen.push(key);
            }
        }
        if seen.is_empty() {
            return Err(ValidationError::EmptyKeys);
        }
        Ok(Self {
            keys: seen,
            start_ts: None,
            end_ts: None,
            limit: None,
            interval_ms: None,
        })
    }

    /// Bound the query to `[start_ts, end_ts)` in epoch milliseconds.
    pub fn with_range(self, start_ts: i64, end_ts: i64) -> Result<Self, ValidationError> {
        if start_ts >= end_ts {
            return Err(ValidationError::InvertedTimeRange { start_ts, end_ts });
        }
        Ok(Self {
            start_ts: Some(start_ts),
            end_ts: Some(end_ts),
            ..self
        })
    }

    /// Cap the total number of points returned per key.
    ///
    /// Values above the upstream page cap are clamped to [`MAX_PAGE_LIMIT`].
    pub fn with_limit(self, limit: u32) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        Ok(Self {
            limit: Some(limit.min(MAX_PAGE_LIMIT)),
            ..self
        })
    }

    /// Request upstream averaging over the given interval (milliseconds).
    pub fn with_interval(self, interval_ms: i64) -> Result<Self, ValidationError> {
        if interval_ms < 1 {
            return Err(ValidationError::ZeroInterval);
        }
        Ok(Self {
            interval_ms: Some(interval_ms),
            ..self
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn start_ts(&self) -> Option<i64> {
        self.start_ts
    }

    pub fn end_ts(&self) -> Option<i64> {
        self.end_ts
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn interval_ms(&self) -> Option<i64> {
        self.interval_ms
    }
}

/// Merged result of a paginated series fetch: key -> chronologically
/// ordered data points spanning the requested range.
///
/// Keys iterate in deterministic (sorted) order. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedSeries {
    series: BTreeMap<String, Vec<DataPoint>>,
}

impl AggregatedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key, keeping its (possibly empty) buffer.
    pub fn insert_key(&mut self, key: impl Into<String>) {
        self.series.entry(key.into()).or_default();
    }

    /// Append a chunk of points to a key's buffer.
    pub fn extend_key(&mut self, key: &str, points: impl IntoIterator<Item = DataPoint>) {
        self.series.entry(key.to_string()).or_default().extend(points);
    }

    /// Truncate a key's buffer to at most `limit` points.
    pub fn truncate_key(&mut self, key: &str, limit: usize) {
        if let Some(points) = self.series.get_mut(key) {
            points.truncate(limit);
        }
    }

    pub fn get(&self, key: &str) -> Option<&[DataPoint]> {
        self.series.get(key).map(|v| v.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DataPoint])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total points across all keys.
    pub fn total_points(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_requires_keys() {
        let err = SeriesQuery::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyKeys);
    }

    #[test]
    fn test_query_rejects_blank_key() {
        let err = SeriesQuery::new(["temperature", "  "]).unwrap_err();
        assert_eq!(err, ValidationError::BlankKey);
    }

    #[test]
    fn test_query_dedupes_keys() {
        let q = SeriesQuery::new(["a", "b", "a"]).unwrap();
        assert_eq!(q.keys(), ["a", "b"]);
    }

    #[test]
    fn test_query_rejects_inverted_range() {
        let err = SeriesQuery::new(["a"])
            .unwrap()
            .with_range(2000, 1000)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvertedTimeRange { .. }));
    }

    #[test]
    fn test_query_clamps_limit_to_page_cap() {
        let q = SeriesQuery::new(["a"]).unwrap().with_limit(5000).unwrap();
        assert_eq!(q.limit(), Some(MAX_PAGE_LIMIT));
    }

    #[test]
    fn test_query_rejects_zero_limit_and_interval() {
        assert_eq!(
            SeriesQuery::new(["a"]).unwrap().with_limit(0).unwrap_err(),
            ValidationError::ZeroLimit
        );
        assert_eq!(
            SeriesQuery::new(["a"]).unwrap().with_interval(0).unwrap_err(),
            ValidationError::ZeroInterval
        );
    }

    #[test]
    fn test_aggregated_series_counts() {
        let mut agg = AggregatedSeries::new();
        agg.insert_key("empty");
        agg.extend_key("temp", vec![DataPoint::new(1, 1.0), DataPoint::new(2, 2.0)]);
        assert_eq!(agg.total_points(), 2);
        assert_eq!(agg.get("empty"), Some(&[][..]));
        assert_eq!(agg.keys().collect::<Vec<_>>(), ["empty", "temp"]);
    }

    #[test]
    fn test_aggregated_series_serializes_as_map() {
        let mut agg = AggregatedSeries::new();
        agg.extend_key("temp", vec![DataPoint::new(1, 1.5)]);
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["temp"][0]["ts"], 1);
    }
}
