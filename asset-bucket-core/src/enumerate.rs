//! Walks the upload root and turns its immediate children into buckets.
//!
//! Every directory directly under the root is one bucket named after the
//! directory. Regular files directly under the root are gathered into a single
//! fallback bucket, yielded after the listing is exhausted. Nothing below the
//! first level becomes a bucket.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where a bucket's candidate files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketMembers {
    /// A directory whose direct regular files are the candidates.
    Directory(PathBuf),
    /// Files that sit directly under the upload root.
    RootFiles(Vec<PathBuf>),
}

/// One bucket found in the upload root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSource {
    pub name: String,
    pub members: BucketMembers,
}

/// Lazy iterator over the buckets of an upload root.
///
/// Listing order is whatever the filesystem returns.
pub struct BucketEnumerator {
    entries: ReadDir,
    root_bucket_name: String,
    root_files: Vec<PathBuf>,
    finished: bool,
}

impl BucketEnumerator {
    /// Start listing `root`. The fallback bucket is named `root_bucket_name`.
    pub fn new(root: &Path, root_bucket_name: impl Into<String>) -> io::Result<Self> {
        info!(root = %root.display(), "Enumerating buckets in upload root");
        Ok(Self {
            entries: fs::read_dir(root)?,
            root_bucket_name: root_bucket_name.into(),
            root_files: Vec::new(),
            finished: false,
        })
    }
}

impl Iterator for BucketEnumerator {
    type Item = io::Result<BucketSource>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for entry in self.entries.by_ref() {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => return Some(Err(e)),
            };
            // Follows symlinks, so a link to a directory is a bucket too.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => return Some(Err(e)),
            };
            if metadata.is_dir() {
                let name = entry_name(&path);
                debug!(bucket = %name, path = %path.display(), "Found directory bucket");
                return Some(Ok(BucketSource {
                    name,
                    members: BucketMembers::Directory(path),
                }));
            } else if metadata.is_file() {
                debug!(file = %path.display(), "Queued root-level file for fallback bucket");
                self.root_files.push(path);
            } else {
                debug!(path = %path.display(), "Skipping entry that is neither file nor directory");
            }
        }

        self.finished = true;
        if self.root_files.is_empty() {
            return None;
        }
        Some(Ok(BucketSource {
            name: self.root_bucket_name.clone(),
            members: BucketMembers::RootFiles(std::mem::take(&mut self.root_files)),
        }))
    }
}

/// List the direct regular files of a bucket directory; subdirectories are ignored.
pub fn bucket_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if fs::metadata(&path)?.is_file() {
            files.push(path);
        } else {
            debug!(path = %path.display(), "Ignoring non-file entry inside bucket");
        }
    }
    Ok(files)
}

/// Base name of a path as a string, lossily converted.
pub fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
