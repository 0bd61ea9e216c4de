//! "Get or create": bind a bucket to a remote release.

use tracing::{debug, error, info, warn};

use crate::bucket::{AssetRecord, Bucket};
use crate::contract::{ApiError, NewRelease, ReleaseStore, RemoteAsset};

/// Release creation failed; the bucket cannot receive uploads this run.
#[derive(Debug, thiserror::Error)]
#[error("failed to create release for bucket `{bucket}`: {source}")]
pub struct ReconcileError {
    pub bucket: String,
    #[source]
    pub source: ApiError,
}

/// Fresh release tag: `v` plus 16 random hex characters.
pub fn generate_tag_name() -> String {
    // The version and variant bits sit in different halves, so the xor is fully random.
    let (high, low) = uuid::Uuid::new_v4().as_u64_pair();
    format!("v{:016x}", high ^ low)
}

/// Point `bucket` at a remote release, reusing the release whose name equals
/// the bucket name exactly, or creating a new one.
///
/// A failed lookup is logged and treated as "not found". When a release is
/// reused its existing assets are loaded into the bucket; when one is created
/// the asset list is reset. Only a failed creation is returned as an error.
pub async fn get_or_create_release<S>(store: &S, bucket: &mut Bucket) -> Result<(), ReconcileError>
where
    S: ReleaseStore + ?Sized,
{
    match find_existing(store, bucket).await {
        Ok(true) => return Ok(()),
        Ok(false) => {}
        Err(e) => {
            log_api_error(&e, &bucket.name, "Lookup of existing release failed");
            warn!(bucket = %bucket.name, "Continuing to create a new release");
        }
    }

    let tag_name = generate_tag_name();
    info!(bucket = %bucket.name, tag = %tag_name, "Creating new release");
    let req = NewRelease {
        tag_name,
        name: bucket.name.clone(),
        body: String::new(),
        draft: false,
        prerelease: false,
    };

    match store.create_release(req).await {
        Ok(release) => {
            info!(bucket = %bucket.name, release_id = release.id, "Release created successfully");
            bucket.release_details = Some(release);
            bucket.assets = Vec::new();
            Ok(())
        }
        Err(e) => {
            log_api_error(&e, &bucket.name, "Failed to create release");
            Err(ReconcileError {
                bucket: bucket.name.clone(),
                source: e,
            })
        }
    }
}

async fn find_existing<S>(store: &S, bucket: &mut Bucket) -> Result<bool, ApiError>
where
    S: ReleaseStore + ?Sized,
{
    info!(bucket = %bucket.name, "Fetching releases");
    let releases = store.list_releases().await?;
    info!(bucket = %bucket.name, count = releases.len(), "Found releases");

    let Some(release) = releases
        .into_iter()
        .find(|r| r.name.as_deref() == Some(bucket.name.as_str()))
    else {
        return Ok(false);
    };

    info!(bucket = %bucket.name, release_id = release.id, "Found existing release");
    let assets = list_all_assets(store, release.id).await?;
    info!(bucket = %bucket.name, count = assets.len(), "Loaded existing release assets");

    bucket.release_details = Some(release);
    bucket.assets = assets.into_iter().map(AssetRecord::existing).collect();
    Ok(true)
}

/// Follow the asset listing of `release_id` until the provider reports no next page.
pub async fn list_all_assets<S>(store: &S, release_id: u64) -> Result<Vec<RemoteAsset>, ApiError>
where
    S: ReleaseStore + ?Sized,
{
    let mut assets = Vec::new();
    let mut page = 1;
    loop {
        let listed = store.list_release_assets(release_id, page).await?;
        debug!(release_id, page, count = listed.assets.len(), "Fetched asset page");
        assets.extend(listed.assets);
        match listed.next_page {
            Some(next) if next > page => page = next,
            Some(next) => {
                warn!(release_id, page, next, "Asset listing did not advance; stopping");
                break;
            }
            None => break,
        }
    }
    Ok(assets)
}

pub(crate) fn log_api_error(e: &ApiError, bucket: &str, context: &str) {
    match e.body() {
        Some(body) => {
            error!(bucket, status = ?e.status(), error = %e, response = %body, "{context}")
        }
        None => error!(bucket, status = ?e.status(), error = %e, "{context}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{AssetPage, MockReleaseStore};
    use mockall::predicate::eq;

    fn asset(id: u64) -> RemoteAsset {
        RemoteAsset {
            id,
            name: format!("file-{id}.bin"),
            label: None,
            content_type: None,
            state: None,
            size: 0,
            download_count: 0,
            url: None,
            browser_download_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn list_all_assets_follows_next_page() {
        let mut store = MockReleaseStore::new();
        store
            .expect_list_release_assets()
            .with(eq(4u64), eq(1u32))
            .times(1)
            .returning(|_, _| {
                Ok(AssetPage {
                    assets: vec![asset(1), asset(2)],
                    next_page: Some(2),
                })
            });
        store
            .expect_list_release_assets()
            .with(eq(4u64), eq(2u32))
            .times(1)
            .returning(|_, _| Ok(AssetPage::last(vec![asset(3)])));

        let assets = list_all_assets(&store, 4).await.unwrap();
        let ids: Vec<u64> = assets.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn list_all_assets_stops_on_a_page_that_points_backwards() {
        let mut store = MockReleaseStore::new();
        store.expect_list_release_assets().times(1).returning(|_, _| {
            Ok(AssetPage {
                assets: vec![asset(1)],
                next_page: Some(1),
            })
        });

        let assets = list_all_assets(&store, 4).await.unwrap();
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn tag_names_are_prefixed_hex() {
        let tag = generate_tag_name();
        assert_eq!(tag.len(), 17);
        assert!(tag.starts_with('v'));
        assert!(tag[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tag_names_use_every_hex_position() {
        // Character 13 of a plain v4 uuid is always `4`.
        let varied = (0..64)
            .map(|_| generate_tag_name().as_bytes()[13])
            .any(|c| c != b'4');
        assert!(varied);
    }

    #[test]
    fn tag_names_do_not_repeat() {
        assert_ne!(generate_tag_name(), generate_tag_name());
    }
}
