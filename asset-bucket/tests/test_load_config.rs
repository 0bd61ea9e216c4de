use asset_bucket::load_config::{load_config, ALL_ENV_VARS};
use asset_bucket_core::config::RootBucketName;
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    for key in ALL_ENV_VARS {
        env::remove_var(key);
    }
}

fn set_required_env() {
    env::set_var("GIT_USER_NAME", "octo");
    env::set_var("GIT_STORAGE_REPOSITORY_NAME", "storage");
    env::set_var("GIT_TOKEN", "top-secret-test-key");
    env::set_var("ASSETS_BUCKET_META_PATH", "./tmp/meta");
    env::set_var("ASSETS_TO_UPLOAD_ROOT_PATH", "./tmp/upload");
}

fn yaml_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), content).unwrap();
    file
}

/// Environment alone is enough to build a full configuration.
#[test]
#[serial]
fn test_load_config_from_env_only() {
    clear_env();
    set_required_env();

    let config = load_config(None).expect("Config should load");

    assert_eq!(config.github.owner, "octo");
    assert_eq!(config.github.repository, "storage");
    assert_eq!(config.github.token, "top-secret-test-key");
    assert_eq!(config.github.api_url, "https://api.github.com");
    assert_eq!(config.github.uploads_url, "https://uploads.github.com");
    assert!(config.github.show_progress);
    assert_eq!(config.sync.manifest_dir, PathBuf::from("./tmp/meta"));
    assert_eq!(config.sync.upload_root, PathBuf::from("./tmp/upload"));
    assert_eq!(
        config.sync.root_bucket,
        RootBucketName::Fixed("root-bucket".into())
    );
    clear_env();
}

/// Each missing required variable is reported by name.
#[test]
#[serial]
fn test_load_config_errors_on_missing_env() {
    for missing in [
        "GIT_USER_NAME",
        "GIT_STORAGE_REPOSITORY_NAME",
        "GIT_TOKEN",
        "ASSETS_BUCKET_META_PATH",
        "ASSETS_TO_UPLOAD_ROOT_PATH",
    ] {
        clear_env();
        set_required_env();
        env::remove_var(missing);

        let err = load_config(None).unwrap_err();
        assert!(
            err.to_string().contains(missing),
            "Must error for missing {missing}, got: {err}"
        );
    }
    clear_env();
}

/// Blank values count as missing.
#[test]
#[serial]
fn test_load_config_treats_blank_as_missing() {
    clear_env();
    set_required_env();
    env::set_var("GIT_TOKEN", "   ");

    let err = load_config(None).unwrap_err();
    assert!(err.to_string().contains("GIT_TOKEN"));
    clear_env();
}

/// YAML supplies non-secret settings; environment overrides it.
#[test]
#[serial]
fn test_load_config_file_with_env_override() {
    clear_env();
    let file = yaml_file(
        r#"
owner: file-owner
repository: file-repo
manifest_dir: ./from-file/meta
upload_root: ./from-file/upload
root_bucket_name: loose-files
api_url: https://ghe.example.com/api/v3
uploads_url: https://ghe.example.com/api/uploads
show_progress: false
"#,
    );
    env::set_var("GIT_TOKEN", "token");
    env::set_var("GIT_USER_NAME", "env-owner");

    let config = load_config(Some(file.path())).expect("Config should load");

    assert_eq!(config.github.owner, "env-owner");
    assert_eq!(config.github.repository, "file-repo");
    assert_eq!(config.github.api_url, "https://ghe.example.com/api/v3");
    assert_eq!(config.github.uploads_url, "https://ghe.example.com/api/uploads");
    assert!(!config.github.show_progress);
    assert_eq!(config.sync.manifest_dir, PathBuf::from("./from-file/meta"));
    assert_eq!(
        config.sync.root_bucket,
        RootBucketName::Fixed("loose-files".into())
    );
    clear_env();
}

/// The token is never taken from the config file.
#[test]
#[serial]
fn test_load_config_rejects_token_in_file() {
    clear_env();
    set_required_env();
    let file = yaml_file("token: should-not-be-here\n");

    let err = load_config(Some(file.path())).unwrap_err();
    assert!(
        err.to_string().contains("parse") || err.to_string().contains("YAML"),
        "Parse error expected, got: {err}"
    );
    clear_env();
}

#[test]
#[serial]
fn test_load_config_generated_root_bucket() {
    clear_env();
    set_required_env();
    env::set_var("ASSETS_ROOT_BUCKET_GENERATED", "true");

    let config = load_config(None).unwrap();
    assert_eq!(config.sync.root_bucket, RootBucketName::Generated);

    env::set_var("ASSETS_ROOT_BUCKET_GENERATED", "maybe");
    let err = load_config(None).unwrap_err();
    assert!(err.to_string().contains("ASSETS_ROOT_BUCKET_GENERATED"));
    clear_env();
}

#[test]
#[serial]
fn test_load_config_rejects_root_bucket_with_separator() {
    clear_env();
    set_required_env();
    env::set_var("ASSETS_ROOT_BUCKET_NAME", "../escape");

    let err = load_config(None).unwrap_err();
    assert!(err.to_string().contains("ASSETS_ROOT_BUCKET_NAME"));
    clear_env();
}

/// If the config file is not valid YAML, load_config errors and reports as such.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    clear_env();
    set_required_env();
    let file = yaml_file("not-yaml: [:::");

    let err = load_config(Some(file.path())).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
    clear_env();
}
