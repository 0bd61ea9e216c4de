use std::path::PathBuf;
use tracing::{debug, info};

/// Name used for the fallback bucket when none is configured.
pub const DEFAULT_ROOT_BUCKET_NAME: &str = "root-bucket";

/// How the fallback bucket for files lying directly under the upload root is named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootBucketName {
    /// Always use the same name, so reruns reuse the same release.
    Fixed(String),
    /// Generate a fresh random token per run.
    Generated,
}

impl Default for RootBucketName {
    fn default() -> Self {
        RootBucketName::Fixed(DEFAULT_ROOT_BUCKET_NAME.to_string())
    }
}

impl RootBucketName {
    /// Resolve the bucket name for this run.
    pub fn resolve(&self) -> String {
        match self {
            RootBucketName::Fixed(name) => name.clone(),
            RootBucketName::Generated => uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Everything the synchronisation pipeline needs besides the remote client.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Directory scanned for buckets and root-level files.
    pub upload_root: PathBuf,
    /// Directory receiving one `<bucket>.json` manifest per bucket.
    pub manifest_dir: PathBuf,
    pub root_bucket: RootBucketName,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            upload_root = %self.upload_root.display(),
            manifest_dir = %self.manifest_dir.display(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
