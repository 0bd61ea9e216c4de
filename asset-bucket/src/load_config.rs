/// `load_config` module: resolves all run settings from the environment and an optional YAML file.
///
/// This is the only place that reads process environment variables or parses
/// user-supplied YAML. The result is an explicit [`AppConfig`] handed to the
/// core pipeline and the GitHub client by parameter.
///
/// # Precedence
/// Environment variables win over YAML keys. The access token is read from the
/// environment only, so config files can be committed without secrets.
///
/// # Errors
/// All errors use `anyhow::Error` and name the missing or invalid key, so they
/// can be surfaced as-is at the CLI boundary.
use anyhow::{Context, Result};
use asset_bucket_core::config::{RootBucketName, SyncConfig, DEFAULT_ROOT_BUCKET_NAME};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::github::{GitHubConfig, DEFAULT_API_URL, DEFAULT_UPLOADS_URL};

pub const ENV_OWNER: &str = "GIT_USER_NAME";
pub const ENV_REPOSITORY: &str = "GIT_STORAGE_REPOSITORY_NAME";
pub const ENV_TOKEN: &str = "GIT_TOKEN";
pub const ENV_MANIFEST_DIR: &str = "ASSETS_BUCKET_META_PATH";
pub const ENV_UPLOAD_ROOT: &str = "ASSETS_TO_UPLOAD_ROOT_PATH";
pub const ENV_ROOT_BUCKET_NAME: &str = "ASSETS_ROOT_BUCKET_NAME";
pub const ENV_ROOT_BUCKET_GENERATED: &str = "ASSETS_ROOT_BUCKET_GENERATED";
pub const ENV_API_URL: &str = "GITHUB_API_URL";
pub const ENV_UPLOADS_URL: &str = "GITHUB_UPLOADS_URL";
pub const ENV_SHOW_PROGRESS: &str = "ASSETS_SHOW_PROGRESS";

/// Every environment variable this module reads.
pub const ALL_ENV_VARS: [&str; 10] = [
    ENV_OWNER,
    ENV_REPOSITORY,
    ENV_TOKEN,
    ENV_MANIFEST_DIR,
    ENV_UPLOAD_ROOT,
    ENV_ROOT_BUCKET_NAME,
    ENV_ROOT_BUCKET_GENERATED,
    ENV_API_URL,
    ENV_UPLOADS_URL,
    ENV_SHOW_PROGRESS,
];

/// Non-secret settings accepted from the YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub manifest_dir: Option<PathBuf>,
    pub upload_root: Option<PathBuf>,
    pub root_bucket_name: Option<String>,
    pub root_bucket_generated: Option<bool>,
    pub api_url: Option<String>,
    pub uploads_url: Option<String>,
    pub show_progress: Option<bool>,
}

/// Fully resolved settings for one run.
#[derive(Debug)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub github: GitHubConfig,
}

/// Environment value, treating unset and blank the same.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => {
            error!(key, value = other, "Invalid boolean setting");
            anyhow::bail!("{key} must be a boolean (true/false), got `{other}`")
        }
    }
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    env_value(key).map(|raw| parse_bool(key, &raw)).transpose()
}

fn required<T>(env_key: &str, yaml_key: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| {
        error!(key = env_key, "Required setting missing");
        anyhow::anyhow!(
            "{env_key} environment variable not set (or `{yaml_key}` in the config file)"
        )
    })
}

fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        error!(name, "Invalid root bucket name");
        anyhow::bail!("{ENV_ROOT_BUCKET_NAME} must be a plain file name, got `{name}`");
    }
    Ok(())
}

/// Read and parse the optional YAML settings file.
pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;
    let parsed: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(parsed)
}

/// Resolve the run configuration from the environment, layered over `path` when given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(path) => read_file_config(path)?,
        None => FileConfig::default(),
    };

    let owner = required(ENV_OWNER, "owner", env_value(ENV_OWNER).or(file.owner))?;
    let repository = required(
        ENV_REPOSITORY,
        "repository",
        env_value(ENV_REPOSITORY).or(file.repository),
    )?;
    let token = env_value(ENV_TOKEN).ok_or_else(|| {
        error!(key = ENV_TOKEN, "Access token missing from environment");
        anyhow::anyhow!("{ENV_TOKEN} environment variable not set")
    })?;
    let manifest_dir = required(
        ENV_MANIFEST_DIR,
        "manifest_dir",
        env_value(ENV_MANIFEST_DIR).map(PathBuf::from).or(file.manifest_dir),
    )?;
    let upload_root = required(
        ENV_UPLOAD_ROOT,
        "upload_root",
        env_value(ENV_UPLOAD_ROOT).map(PathBuf::from).or(file.upload_root),
    )?;

    let generated = env_bool(ENV_ROOT_BUCKET_GENERATED)?
        .or(file.root_bucket_generated)
        .unwrap_or(false);
    let root_bucket = if generated {
        RootBucketName::Generated
    } else {
        let name = env_value(ENV_ROOT_BUCKET_NAME)
            .or(file.root_bucket_name)
            .unwrap_or_else(|| DEFAULT_ROOT_BUCKET_NAME.to_string());
        validate_bucket_name(&name)?;
        RootBucketName::Fixed(name)
    };

    let show_progress = env_bool(ENV_SHOW_PROGRESS)?
        .or(file.show_progress)
        .unwrap_or(true);

    let github = GitHubConfig {
        owner,
        repository,
        token,
        api_url: env_value(ENV_API_URL)
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        uploads_url: env_value(ENV_UPLOADS_URL)
            .or(file.uploads_url)
            .unwrap_or_else(|| DEFAULT_UPLOADS_URL.to_string()),
        show_progress,
    };
    let sync = SyncConfig {
        upload_root,
        manifest_dir,
        root_bucket,
    };

    info!(
        owner = %github.owner,
        repository = %github.repository,
        upload_root = %sync.upload_root.display(),
        manifest_dir = %sync.manifest_dir.display(),
        "Config loaded and merged successfully"
    );
    Ok(AppConfig { sync, github })
}

/// Load `.env` into the process environment when present.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded environment from .env"),
        Err(e) if e.not_found() => {}
        Err(e) => error!(error = %e, "Failed to load .env file"),
    }
}

/// Shorthand used by the CLI: load `path` if given, attaching it to any error.
pub fn load_config_with_context(path: Option<&Path>) -> Result<AppConfig> {
    load_config(path).with_context(|| match path {
        Some(p) => format!("Invalid configuration (file {})", p.display()),
        None => "Invalid configuration".to_string(),
    })
}
