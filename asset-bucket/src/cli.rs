//! CLI glue for asset-bucket: argument parsing, wiring and the user-visible summary.
//!
//! All bucket logic lives in `asset-bucket-core`; this module only resolves
//! configuration, builds the [`GitHubClient`] and hands both to
//! [`synchronise`]. [`run`] is shared by `main` and the integration tests.
use crate::github::GitHubClient;
use crate::load_config::load_config_with_context;
use anyhow::{Context, Result};
use asset_bucket_core::synchronise::{synchronise, SynchroniseReport};
use clap::Parser;
use std::path::PathBuf;

/// Upload a local directory tree to GitHub release assets, one release per bucket.
#[derive(Parser, Debug)]
#[clap(
    name = "asset-bucket",
    version,
    about = "Upload a local directory tree to GitHub release assets, one release per bucket"
)]
pub struct Cli {
    /// Optional YAML file with non-secret settings; environment variables take precedence
    #[clap(long)]
    pub config: Option<PathBuf>,
}

fn print_report(report: &SynchroniseReport) {
    println!("Synchronise complete: {} bucket(s)", report.buckets.len());
    for bucket in &report.buckets {
        let release = bucket
            .release_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<32} release={:<12} uploaded={} skipped={} failed={}",
            bucket.name,
            release,
            bucket.summary.uploaded,
            bucket.summary.skipped,
            bucket.summary.failed
        );
        if let Some(e) = &bucket.error {
            println!("    error: {e}");
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config_with_context(cli.config.as_deref())?;
    let client = GitHubClient::new(config.github).context("Failed to construct GitHub client")?;

    tracing::info!(command = "sync", "Starting synchronisation process");
    match synchronise(&config.sync, &client).await {
        Ok(report) => {
            tracing::info!(
                command = "sync",
                buckets = report.buckets.len(),
                failed = report.failed_buckets().count(),
                "Synchronisation complete"
            );
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e).context("Synchronisation failed"))
        }
    }
}
