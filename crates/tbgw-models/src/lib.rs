//! Shared data models for the TB gateway core.
//!
//! This crate provides Serde-serializable types for:
//! - Timestamped telemetry data points
//! - Time-bounded multi-key series queries
//! - Aggregated series results assembled by the pagination engine
//! - Telemetry/attribute upload payloads (single device and bulk)

pub mod error;
pub mod point;
pub mod series;
pub mod upload;

// Re-export common types
pub use error::ValidationError;
pub use point::DataPoint;
pub use series::{AggregatedSeries, SeriesQuery, MAX_PAGE_LIMIT};
pub use upload::{
    AttributeScope, AttributesUpload, BulkUpload, BulkUploadReport, DeviceUploadOutcome,
    TelemetryUpload,
};
