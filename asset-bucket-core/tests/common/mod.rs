#![allow(dead_code)]

use asset_bucket_core::config::{RootBucketName, SyncConfig};
use asset_bucket_core::contract::{
    ApiError, AssetPage, NewRelease, NewReleaseAsset, ReleaseStore, RemoteAsset, RemoteRelease,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub fn release(id: u64, name: &str) -> RemoteRelease {
    RemoteRelease {
        id,
        name: Some(name.to_string()),
        tag_name: format!("v{id:016x}"),
        html_url: Some(format!("https://github.com/owner/store/releases/tag/v{id:016x}")),
        url: None,
        upload_url: None,
        draft: false,
        prerelease: false,
        created_at: None,
    }
}

pub fn asset(id: u64, name: &str) -> RemoteAsset {
    RemoteAsset {
        id,
        name: name.to_string(),
        label: None,
        content_type: Some("application/octet-stream".into()),
        state: Some("uploaded".into()),
        size: 1,
        download_count: 0,
        url: Some(format!("https://api.github.com/repos/owner/store/releases/assets/{id}")),
        browser_download_url: Some(format!("https://github.com/owner/store/releases/download/t/{name}")),
        created_at: None,
        updated_at: None,
    }
}

pub fn sync_config(upload_root: &Path, manifest_dir: &Path) -> SyncConfig {
    SyncConfig {
        upload_root: upload_root.to_path_buf(),
        manifest_dir: manifest_dir.to_path_buf(),
        root_bucket: RootBucketName::default(),
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    releases: Vec<RemoteRelease>,
    assets: HashMap<u64, Vec<RemoteAsset>>,
    uploads: usize,
    creates: usize,
}

/// In-memory release store that behaves like the provider for a single repository.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<FakeState>,
    page_size: Option<usize>,
}

impl FakeStore {
    /// Store whose asset listings are split into pages of `page_size`.
    pub fn paged(page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> usize {
        self.state.lock().unwrap().uploads
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn asset_count(&self) -> usize {
        self.state.lock().unwrap().assets.values().map(Vec::len).sum()
    }
}

#[async_trait::async_trait]
impl ReleaseStore for FakeStore {
    async fn list_releases(&self) -> Result<Vec<RemoteRelease>, ApiError> {
        Ok(self.state.lock().unwrap().releases.clone())
    }

    async fn create_release(&self, req: NewRelease) -> Result<RemoteRelease, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.creates += 1;
        let mut created = release(state.next_id, &req.name);
        created.tag_name = req.tag_name;
        state.releases.push(created.clone());
        Ok(created)
    }

    async fn list_release_assets(&self, release_id: u64, page: u32) -> Result<AssetPage, ApiError> {
        let all = self
            .state
            .lock()
            .unwrap()
            .assets
            .get(&release_id)
            .cloned()
            .unwrap_or_default();
        let Some(size) = self.page_size else {
            return Ok(AssetPage::last(all));
        };
        let start = (page as usize - 1) * size;
        let assets: Vec<RemoteAsset> = all.iter().skip(start).take(size).cloned().collect();
        let next_page = (start + size < all.len()).then_some(page + 1);
        Ok(AssetPage { assets, next_page })
    }

    async fn upload_release_asset(&self, req: NewReleaseAsset) -> Result<RemoteAsset, ApiError> {
        let mut state = self.state.lock().unwrap();
        let exists = state
            .assets
            .get(&req.release_id)
            .is_some_and(|assets| assets.iter().any(|a| a.name == req.name));
        if exists {
            return Err(ApiError::ConflictDuplicateAsset { name: req.name });
        }
        state.next_id += 1;
        state.uploads += 1;
        let mut uploaded = asset(state.next_id, &req.name);
        uploaded.size = req.data.len() as u64;
        uploaded.content_type = Some(req.content_type);
        state.assets.entry(req.release_id).or_default().push(uploaded.clone());
        Ok(uploaded)
    }
}
