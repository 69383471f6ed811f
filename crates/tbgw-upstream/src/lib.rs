//! Upstream session management and telemetry pagination.
//!
//! This crate provides:
//! - A thread-safe credential store with proactive expiry tracking
//! - A session manager that keeps one shared upstream login alive,
//!   serializing refreshes under concurrent load
//! - A thin authenticated HTTP client over the upstream REST API
//! - A telemetry engine that stitches rate-capped upstream pages into
//!   complete series, plus upload and device-listing operations
//! - A breadth-first walker over the upstream's entity relation graph

pub mod client;
pub mod config;
pub mod devices;
pub mod error;
pub mod relations;
pub mod session;
pub mod telemetry;
pub mod token_store;

pub use client::UpstreamClient;
pub use config::UpstreamConfig;
pub use devices::{DeviceDirectory, EntityListing};
pub use error::{UpstreamError, UpstreamResult};
pub use relations::{
    EntityGraph, GraphEdge, GraphNode, GraphQuery, RelationDirection, RelationWalker,
};
pub use session::SessionManager;
pub use telemetry::{LatestSnapshot, TelemetryReader};
pub use token_store::TokenStore;
