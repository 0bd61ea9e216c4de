//! High-level pipeline: enumerate → reconcile → upload → write manifest, per bucket.
//!
//! This module provides the top-level orchestration for one synchronisation run.
//! Buckets are processed one at a time in listing order, and files within a
//! bucket one at a time:
//!   - Enumerate the upload root into buckets (see [`crate::enumerate`])
//!   - Bind each bucket to a remote release (see [`crate::reconcile`])
//!   - Upload files the release does not hold yet (see [`crate::upload`])
//!   - Persist the bucket's manifest (see [`crate::manifest`])
//!
//! # Error Handling
//! A failure inside one bucket is logged and recorded in its [`BucketReport`];
//! its manifest is still written with whatever state was reached, and the run
//! continues with the next bucket. Only an unreadable upload root aborts the run.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`SynchroniseReport`], [`BucketReport`], [`SyncError`].

use std::path::PathBuf;
use tracing::{error, info};

use crate::bucket::Bucket;
use crate::config::SyncConfig;
use crate::contract::ReleaseStore;
use crate::enumerate::{BucketEnumerator, BucketSource};
use crate::manifest::write_manifest;
use crate::reconcile::get_or_create_release;
use crate::upload::{upload_bucket_assets, UploadSummary};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to list upload root {path}: {source}")]
    UploadRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub buckets: Vec<BucketReport>,
}

impl SynchroniseReport {
    /// Buckets that hit an error at any stage.
    pub fn failed_buckets(&self) -> impl Iterator<Item = &BucketReport> {
        self.buckets.iter().filter(|b| b.error.is_some())
    }
}

#[derive(Debug)]
pub struct BucketReport {
    pub name: String,
    pub release_id: Option<u64>,
    pub summary: UploadSummary,
    /// Where the manifest landed, if writing it succeeded.
    pub manifest_path: Option<PathBuf>,
    pub error: Option<String>,
}

pub async fn synchronise<S>(config: &SyncConfig, store: &S) -> Result<SynchroniseReport, SyncError>
where
    S: ReleaseStore + ?Sized,
{
    info!("[SYNC] Starting bucket synchronisation");
    config.trace_loaded();

    let root_bucket_name = config.root_bucket.resolve();
    let enumerator = BucketEnumerator::new(&config.upload_root, root_bucket_name).map_err(|source| {
        error!(root = %config.upload_root.display(), error = %source, "[SYNC][ERROR] Cannot list upload root");
        SyncError::UploadRoot {
            path: config.upload_root.clone(),
            source,
        }
    })?;

    let mut report = SynchroniseReport::default();
    for entry in enumerator {
        let source = match entry {
            Ok(source) => source,
            Err(e) => {
                error!(root = %config.upload_root.display(), error = %e, "[SYNC][ERROR] Failed to read upload root entry");
                continue;
            }
        };
        report.buckets.push(sync_bucket(config, store, &source).await);
    }

    info!(
        buckets = report.buckets.len(),
        failed = report.failed_buckets().count(),
        "[SYNC] Synchronisation finished"
    );
    Ok(report)
}

async fn sync_bucket<S>(config: &SyncConfig, store: &S, source: &BucketSource) -> BucketReport
where
    S: ReleaseStore + ?Sized,
{
    info!(bucket = %source.name, "[SYNC] Uploading asset bucket");
    let mut bucket = Bucket::new(source.name.clone());
    let mut summary = UploadSummary::default();

    let mut error = None;
    match get_or_create_release(store, &mut bucket).await {
        Ok(()) => match upload_bucket_assets(store, &mut bucket, &source.members).await {
            Ok(s) => summary = s,
            Err(e) => error = Some(e.to_string()),
        },
        Err(e) => error = Some(e.to_string()),
    }
    if let Some(e) = &error {
        error!(bucket = %bucket.name, error = %e, "[SYNC][ERROR] Bucket synchronisation failed");
    }

    let manifest_path = match write_manifest(&config.manifest_dir, &bucket) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(bucket = %bucket.name, error = %e, "[SYNC][ERROR] Failed to write bucket manifest");
            error.get_or_insert_with(|| e.to_string());
            None
        }
    };

    BucketReport {
        release_id: bucket.release_id(),
        name: bucket.name,
        summary,
        manifest_path,
        error,
    }
}
