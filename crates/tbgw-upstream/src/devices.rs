//! Tenant entity listing: devices, assets and their profiles.
//!
//! Thin pass-through of the upstream's paged listing endpoints; the page
//! envelope (`data`, `totalPages`, `hasNext`, ...) is returned as-is.

use serde_json::Value;

use crate::client::UpstreamClient;
use crate::error::UpstreamResult;

/// Paging and filter parameters for device and asset listings.
#[derive(Debug, Clone)]
pub struct EntityListing {
    /// Zero-based page index.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
    /// Optional name filter.
    pub text_search: Option<String>,
    /// Optional profile name filter (device type or asset type).
    pub type_filter: Option<String>,
}

impl Default for EntityListing {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 100,
            text_search: None,
            type_filter: None,
        }
    }
}

/// Read-only device and asset discovery over an authenticated client.
pub struct DeviceDirectory {
    client: UpstreamClient,
}

impl DeviceDirectory {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Paged list of the tenant's devices.
    pub async fn list_devices(&self, listing: &EntityListing) -> UpstreamResult<Value> {
        self.list("/api/tenant/devices", listing).await
    }

    /// Paged list of the tenant's assets.
    pub async fn list_assets(&self, listing: &EntityListing) -> UpstreamResult<Value> {
        self.list("/api/tenant/assets", listing).await
    }

    /// Paged list of device profiles, useful for discovering the type
    /// names accepted by [`EntityListing::type_filter`].
    pub async fn list_device_profiles(&self, page: u32, page_size: u32) -> UpstreamResult<Value> {
        self.list_profiles("/api/deviceProfiles", page, page_size).await
    }

    /// Paged list of asset profiles.
    pub async fn list_asset_profiles(&self, page: u32, page_size: u32) -> UpstreamResult<Value> {
        self.list_profiles("/api/assetProfiles", page, page_size).await
    }

    async fn list(&self, path: &str, listing: &EntityListing) -> UpstreamResult<Value> {
        let mut params = vec![
            ("page", listing.page.to_string()),
            ("pageSize", listing.page_size.to_string()),
        ];
        if let Some(search) = &listing.text_search {
            params.push(("textSearch", search.clone()));
        }
        if let Some(type_filter) = &listing.type_filter {
            params.push(("type", type_filter.clone()));
        }
        self.client.get_json(path, &params).await
    }

    async fn list_profiles(&self, path: &str, page: u32, page_size: u32) -> UpstreamResult<Value> {
        let params = vec![
            ("page", page.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        self.client.get_json(path, &params).await
    }
}
