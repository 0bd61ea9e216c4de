//! Uploads the files of one bucket as release assets.
//!
//! Files whose sanitised name is already known for the bucket are skipped, so
//! reruns do not duplicate assets. A failure on one file is logged and the
//! loop moves on; nothing here is retried.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::bucket::{AssetRecord, Bucket};
use crate::contract::{ApiError, NewReleaseAsset, ReleaseStore};
use crate::enumerate::{bucket_files, entry_name, BucketMembers};
use crate::reconcile::log_api_error;
use crate::sanitize::sanitize_file_name;

/// Fallback content type when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("bucket `{0}` has no release to upload to")]
    NoRelease(String),

    #[error("failed to list bucket directory {path}: {source}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-file outcome counts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Uploaded,
    Skipped,
    Failed,
}

/// Content type guessed from the file extension.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Upload every candidate file of `members` that the bucket does not hold yet.
///
/// Requires the bucket's release to be resolved. Successful uploads are
/// appended to `bucket.assets` immediately, so a later failure still leaves
/// them in the manifest.
pub async fn upload_bucket_assets<S>(
    store: &S,
    bucket: &mut Bucket,
    members: &BucketMembers,
) -> Result<UploadSummary, UploadError>
where
    S: ReleaseStore + ?Sized,
{
    let release_id = bucket
        .release_id()
        .ok_or_else(|| UploadError::NoRelease(bucket.name.clone()))?;

    let candidates = match members {
        BucketMembers::RootFiles(files) => files.clone(),
        BucketMembers::Directory(dir) => {
            bucket_files(dir).map_err(|source| UploadError::ListDirectory {
                path: dir.clone(),
                source,
            })?
        }
    };
    info!(bucket = %bucket.name, candidates = candidates.len(), "Uploading bucket assets");

    let mut summary = UploadSummary::default();
    for path in &candidates {
        match upload_file(store, bucket, release_id, path).await {
            FileOutcome::Uploaded => summary.uploaded += 1,
            FileOutcome::Skipped => summary.skipped += 1,
            FileOutcome::Failed => summary.failed += 1,
        }
    }

    info!(
        bucket = %bucket.name,
        uploaded = summary.uploaded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Finished uploading bucket assets"
    );
    Ok(summary)
}

async fn upload_file<S>(store: &S, bucket: &mut Bucket, release_id: u64, path: &Path) -> FileOutcome
where
    S: ReleaseStore + ?Sized,
{
    let name = sanitize_file_name(&entry_name(path));
    if bucket.has_asset(&name) {
        info!(bucket = %bucket.name, file = %name, "Asset already exists, skipping");
        return FileOutcome::Skipped;
    }

    let content_type = content_type_for(path);
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) => {
            error!(bucket = %bucket.name, file = %path.display(), error = %e, "Failed to read local file");
            return FileOutcome::Failed;
        }
    };
    debug!(file = %name, content_type = %content_type, size = data.len(), "Prepared asset upload");

    info!(bucket = %bucket.name, file = %name, "Uploading asset");
    let req = NewReleaseAsset {
        release_id,
        name: name.clone(),
        content_type,
        data,
    };
    match store.upload_release_asset(req).await {
        Ok(asset) => {
            info!(bucket = %bucket.name, file = %name, asset_id = asset.id, "Asset uploaded successfully");
            bucket.assets.push(AssetRecord::uploaded(name, asset));
            FileOutcome::Uploaded
        }
        Err(ApiError::ConflictDuplicateAsset { .. }) => {
            warn!(bucket = %bucket.name, file = %name, "Asset already exists on the release, skipping");
            FileOutcome::Skipped
        }
        Err(e) => {
            log_api_error(&e, &bucket.name, &format!("Failed to upload asset {name}"));
            FileOutcome::Failed
        }
    }
}
