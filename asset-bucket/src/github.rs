#![doc = "GitHub implementation of the release store: bridges the core `ReleaseStore` trait to the GitHub REST API."]
//
//! # GitHub Release Store
//!
//! This module wires the [`ReleaseStore`] trait from `asset-bucket-core` to
//! the GitHub REST v3 API, and provides the [`GitHubClient`] used by the CLI.
//!
//! - Construct [`GitHubClient`] from a [`GitHubConfig`] (see `load_config`).
//! - All transport, serialisation and error classification happen here; the
//!   core only ever sees [`ApiError`] variants.
//! - Upload progress is an optional indicatif bar on stderr.
//!
//! Release listing reads only the provider's first page. Asset listing is paged
//! through the `Link` response header.

use async_trait::async_trait;
use bytes::Bytes;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::fmt;

use asset_bucket_core::contract::{
    ApiError, AssetPage, NewRelease, NewReleaseAsset, ReleaseStore, RemoteAsset, RemoteRelease,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_UPLOADS_URL: &str = "https://uploads.github.com";
const API_VERSION: &str = "2022-11-28";
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const ASSETS_PER_PAGE: u32 = 100;

/// Coordinates and credentials for the storage repository.
#[derive(Clone)]
pub struct GitHubConfig {
    pub owner: String,
    pub repository: String,
    pub token: String,
    pub api_url: String,
    pub uploads_url: String,
    pub show_progress: bool,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("uploads_url", &self.uploads_url)
            .field("show_progress", &self.show_progress)
            .finish()
    }
}

/// Which call failed; drives error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    ListReleases,
    CreateRelease,
    ListAssets,
    UploadAsset { name: &'a str },
}

impl Operation<'_> {
    fn is_listing(&self) -> bool {
        matches!(self, Operation::ListReleases | Operation::ListAssets)
    }
}

/// Pull GitHub's `message` field out of an error body, if there is one.
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// Map a non-success response to an [`ApiError`].
pub fn classify_failure(op: Operation<'_>, status: u16, body: &str) -> ApiError {
    if let Operation::UploadAsset { name } = op {
        if status == 422 && body.contains("already_exists") {
            return ApiError::ConflictDuplicateAsset {
                name: name.to_string(),
            };
        }
    }
    let message = error_message(status, body);
    if op.is_listing() {
        return ApiError::NotFoundOrListFailed {
            status: Some(status),
            message,
        };
    }
    ApiError::Other {
        status: Some(status),
        message,
        body: (!body.is_empty()).then(|| body.to_string()),
    }
}

/// Map a failure without a usable response (transport or decoding) to an [`ApiError`].
pub fn classify_transport(op: Operation<'_>, status: Option<u16>, message: String) -> ApiError {
    if op.is_listing() {
        ApiError::NotFoundOrListFailed { status, message }
    } else {
        ApiError::Other {
            status,
            message,
            body: None,
        }
    }
}

/// Page number of the `rel="next"` entry of a `Link` header.
pub fn next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|p| p.trim() == r#"rel="next""#) {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let url = reqwest::Url::parse(target).ok()?;
        let page = url.query_pairs().find(|(key, _)| key == "page")?.1;
        page.parse().ok()
    })
}

pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(mut config: GitHubConfig) -> anyhow::Result<Self> {
        config.api_url = config.api_url.trim_end_matches('/').to_string();
        config.uploads_url = config.uploads_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| anyhow::anyhow!("GIT_TOKEN is not a valid header value: {e}"))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        tracing::info!(
            owner = %config.owner,
            repository = %config.repository,
            api_url = %config.api_url,
            token_set = !config.token.is_empty(),
            "Initialized GitHubClient"
        );
        Ok(Self { http, config })
    }

    fn repo_url(&self, base: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            base, self.config.owner, self.config.repository
        )
    }

    pub fn releases_url(&self) -> String {
        format!("{}/releases", self.repo_url(&self.config.api_url))
    }

    pub fn assets_url(&self, release_id: u64) -> String {
        format!("{}/releases/{}/assets", self.repo_url(&self.config.api_url), release_id)
    }

    pub fn upload_url(&self, release_id: u64) -> String {
        format!(
            "{}/releases/{}/assets",
            self.repo_url(&self.config.uploads_url),
            release_id
        )
    }

    /// Send `request`, turning transport failures and non-success statuses into [`ApiError`]s.
    async fn send(
        &self,
        op: Operation<'_>,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, operation = ?op, "Request to GitHub failed");
            classify_transport(op, e.status().map(|s| s.as_u16()), e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), operation = ?op, response = %body, "GitHub returned an error");
            return Err(classify_failure(op, status.as_u16(), &body));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        op: Operation<'_>,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = %e, operation = ?op, "Failed to decode GitHub response");
            classify_transport(op, Some(status), format!("invalid response body: {e}"))
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        op: Operation<'_>,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(op, request).await?;
        Self::decode(op, response).await
    }

    fn progress_bar(&self, name: &str, total: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:40}] {bytes}/{total_bytes} ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(name.to_string());
        bar
    }

    /// Hand `data` to the transport in chunks, advancing `progress` as each one is taken.
    fn upload_body(data: Vec<u8>, progress: ProgressBar) -> reqwest::Body {
        let stream = futures::stream::iter(chunk_bytes(Bytes::from(data)).map(move |chunk| {
            progress.inc(chunk.len() as u64);
            Ok::<_, std::io::Error>(chunk)
        }));
        reqwest::Body::wrap_stream(stream)
    }
}

/// Split `data` into views of at most [`UPLOAD_CHUNK_SIZE`] bytes sharing one buffer.
fn chunk_bytes(data: Bytes) -> impl Iterator<Item = Bytes> {
    (0..data.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(move |start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(data.len())))
}

#[async_trait]
impl ReleaseStore for GitHubClient {
    async fn list_releases(&self) -> Result<Vec<RemoteRelease>, ApiError> {
        tracing::info!(repository = %self.config.repository, "Listing releases");
        let releases: Vec<RemoteRelease> = self
            .send_json(Operation::ListReleases, self.http.get(self.releases_url()))
            .await?;
        tracing::info!(count = releases.len(), "Fetched releases");
        Ok(releases)
    }

    async fn create_release(&self, req: NewRelease) -> Result<RemoteRelease, ApiError> {
        tracing::info!(name = %req.name, tag = %req.tag_name, "Creating release");
        let release: RemoteRelease = self
            .send_json(
                Operation::CreateRelease,
                self.http.post(self.releases_url()).json(&req),
            )
            .await?;
        tracing::info!(release_id = release.id, "Successfully created release");
        Ok(release)
    }

    async fn list_release_assets(&self, release_id: u64, page: u32) -> Result<AssetPage, ApiError> {
        tracing::info!(release_id, page, "Listing release assets");
        let request = self
            .http
            .get(self.assets_url(release_id))
            .query(&[("per_page", ASSETS_PER_PAGE), ("page", page)]);
        let response = self.send(Operation::ListAssets, request).await?;
        let next = response
            .headers()
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page);
        let assets: Vec<RemoteAsset> = Self::decode(Operation::ListAssets, response).await?;
        tracing::info!(release_id, page, count = assets.len(), next_page = ?next, "Fetched release assets");
        Ok(AssetPage {
            assets,
            next_page: next,
        })
    }

    async fn upload_release_asset(&self, req: NewReleaseAsset) -> Result<RemoteAsset, ApiError> {
        let NewReleaseAsset {
            release_id,
            name,
            content_type,
            data,
        } = req;
        let total = data.len() as u64;
        tracing::info!(release_id, file = %name, bytes = total, "Uploading release asset");

        let progress = self.progress_bar(&name, total);
        let request = self
            .http
            .post(self.upload_url(release_id))
            .query(&[("name", name.as_str())])
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, total)
            .body(Self::upload_body(data, progress.clone()));

        let result = self
            .send_json::<RemoteAsset>(Operation::UploadAsset { name: &name }, request)
            .await;
        progress.finish_and_clear();

        let asset = result?;
        tracing::info!(asset_id = asset.id, file = %name, "Successfully uploaded release asset");
        Ok(asset)
    }
}
