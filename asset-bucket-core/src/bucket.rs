use serde::{Deserialize, Serialize};

use crate::contract::{RemoteAsset, RemoteRelease};

/// One local bucket and what this run knows about its remote counterpart.
///
/// Field order is the manifest key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    pub release_details: Option<RemoteRelease>,
    pub assets: Vec<AssetRecord>,
}

/// An asset known to exist on the bucket's release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub name: String,
    pub asset_data: RemoteAsset,
    /// Public download URL reported by the provider, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release_details: None,
            assets: Vec::new(),
        }
    }

    /// Id of the resolved release, if reconciliation succeeded.
    pub fn release_id(&self) -> Option<u64> {
        self.release_details.as_ref().map(|r| r.id)
    }

    /// Case-insensitive lookup of an asset name.
    pub fn has_asset(&self, name: &str) -> bool {
        self.assets
            .iter()
            .any(|asset| asset.name.to_lowercase() == name.to_lowercase())
    }
}

impl AssetRecord {
    /// Record for an asset that was already attached to the release; keeps the remote name verbatim.
    pub fn existing(asset: RemoteAsset) -> Self {
        Self::uploaded(asset.name.clone(), asset)
    }

    /// Record for an asset uploaded in this run under `name`.
    pub fn uploaded(name: String, asset: RemoteAsset) -> Self {
        Self {
            name,
            origin_url: asset.browser_download_url.clone(),
            asset_data: asset,
        }
    }
}
