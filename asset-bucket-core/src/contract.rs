//! # contract: interface to the remote release provider
//!
//! This module defines the [`ReleaseStore`] trait and the plain data types that
//! cross it. The synchronisation pipeline only ever talks to the provider
//! through this trait, so it can be driven by the real GitHub client, an
//! in-memory fake or a `mockall` mock.
//!
//! Remote descriptors are deliberately narrow: only the fields this crate reads
//! or records in manifests are modelled, everything else the provider returns
//! is ignored during deserialisation.
//!
//! ## Errors
//! Every method returns an [`ApiError`]. Implementors must classify failures
//! into its variants; callers branch on the variant, never on message text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A release as returned by the provider. The provider is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
    pub id: u64,
    /// Release title. Buckets are matched against this field.
    #[serde(default)]
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// An asset attached to a release, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub browser_download_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Request payload for creating a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    /// Release title; set to the bucket name.
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

/// Request payload for uploading a single asset to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReleaseAsset {
    pub release_id: u64,
    /// Remote asset name (already sanitised by the caller).
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// One page of a release's asset listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPage {
    pub assets: Vec<RemoteAsset>,
    /// Number of the following page, `None` on the last one.
    pub next_page: Option<u32>,
}

impl AssetPage {
    /// A single page with nothing after it.
    pub fn last(assets: Vec<RemoteAsset>) -> Self {
        Self {
            assets,
            next_page: None,
        }
    }
}

/// Classified failure of a provider call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A listing call failed, or the listed resource does not exist.
    #[error("list request failed (status {status:?}): {message}")]
    NotFoundOrListFailed {
        status: Option<u16>,
        message: String,
    },

    /// The release already holds an asset with this name.
    #[error("asset `{name}` already exists on the release")]
    ConflictDuplicateAsset { name: String },

    /// Any other provider or transport failure.
    #[error("API error (status {status:?}): {message}")]
    Other {
        status: Option<u16>,
        message: String,
        body: Option<String>,
    },
}

impl ApiError {
    /// HTTP status attached to the failure, if the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFoundOrListFailed { status, .. } => *status,
            ApiError::ConflictDuplicateAsset { .. } => Some(422),
            ApiError::Other { status, .. } => *status,
        }
    }

    /// Raw response body, when one was captured.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Other { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

/// Remote release storage for one configured repository.
///
/// Implementors own authentication, transport and the repository coordinates;
/// callers only pass release ids and payloads. Calls are made strictly one at a
/// time by the pipeline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// List releases of the repository (first page, provider default size).
    async fn list_releases(&self) -> Result<Vec<RemoteRelease>, ApiError>;

    /// Create a new release.
    async fn create_release(&self, req: NewRelease) -> Result<RemoteRelease, ApiError>;

    /// List one page (1-based) of the assets already attached to a release.
    async fn list_release_assets(&self, release_id: u64, page: u32)
        -> Result<AssetPage, ApiError>;

    /// Upload one asset to a release and return the provider's descriptor for it.
    async fn upload_release_asset(&self, req: NewReleaseAsset) -> Result<RemoteAsset, ApiError>;
}
