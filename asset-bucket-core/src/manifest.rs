//! Per-bucket JSON manifests.
//!
//! A manifest is the full [`Bucket`] as this run knows it, written to
//! `<manifest dir>/<bucket name>.json`. It replaces any previous file of the
//! same name.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::bucket::Bucket;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Location of the manifest for `bucket_name` inside `manifest_dir`.
pub fn manifest_path(manifest_dir: &Path, bucket_name: &str) -> PathBuf {
    manifest_dir.join(format!("{bucket_name}.json"))
}

/// Serialise with four-space indentation.
fn to_pretty_json(bucket: &Bucket) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    bucket.serialize(&mut serializer)?;
    Ok(out)
}

/// Write the bucket's manifest, creating `manifest_dir` when needed.
pub fn write_manifest(manifest_dir: &Path, bucket: &Bucket) -> Result<PathBuf, ManifestError> {
    fs::create_dir_all(manifest_dir).map_err(|source| ManifestError::Io {
        path: manifest_dir.to_path_buf(),
        source,
    })?;

    let path = manifest_path(manifest_dir, &bucket.name);
    let json = to_pretty_json(bucket).map_err(|source| ManifestError::Json {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), bytes = json.len(), "Serialised bucket manifest");

    fs::write(&path, json).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    info!(
        bucket = %bucket.name,
        assets = bucket.assets.len(),
        path = %path.display(),
        "Wrote bucket manifest"
    );
    Ok(path)
}

/// Load a manifest written by [`write_manifest`].
pub fn read_manifest(path: &Path) -> Result<Bucket, ManifestError> {
    let content = fs::read(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&content).map_err(|source| ManifestError::Json {
        path: path.to_path_buf(),
        source,
    })
}
