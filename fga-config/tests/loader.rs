use std::fs;
use std::time::Duration;

use fga_config::models::sources::EnvConfig;
use fga_config::{
    ConfigGuardRailError, ConfigLoadError, ConfigLoader, ConfigOverrides,
};
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
[database]
url = "postgresql://fga@db.internal:5432/fga"

[flickr]
app_credentials = "secrets/app_api_key.json"
user_credentials = ["secrets/ada.json", "/srv/fga/grace.json"]
request_timeout = "45s"

[processor]
max_concurrent_requests = 4
max_requests_per_run = 200
abandoned_attempt_after = "12h"
"#;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("fga.toml");
    fs::write(&path, body).unwrap();
    path
}

fn loader(path: &std::path::Path) -> ConfigLoader {
    ConfigLoader::new()
        .with_env_file(None)
        .with_config_path(path)
}

#[test]
fn file_values_are_used_and_paths_resolve_against_the_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let load = loader(&path).load_with_env(EnvConfig::default()).unwrap();
    let config = load.config;

    assert_eq!(
        config.database.url.as_deref(),
        Some("postgresql://fga@db.internal:5432/fga")
    );
    assert_eq!(
        config.flickr.app_credentials,
        Some(dir.path().join("secrets/app_api_key.json"))
    );
    assert_eq!(
        config.flickr.user_credentials,
        vec![
            dir.path().join("secrets/ada.json"),
            std::path::PathBuf::from("/srv/fga/grace.json"),
        ]
    );
    assert_eq!(config.flickr.request_timeout, Duration::from_secs(45));
    assert_eq!(
        config.flickr.endpoint.as_str(),
        "https://api.flickr.com/services/rest/"
    );
    assert_eq!(config.processor.max_concurrent_requests, 4);
    assert_eq!(config.processor.max_requests_per_run, Some(200));
    assert_eq!(
        config.processor.abandoned_attempt_after,
        Duration::from_secs(12 * 3600)
    );
    assert_eq!(config.metadata.config_path.as_deref(), Some(path.as_path()));
    assert!(load.warnings.is_empty());
}

#[test]
fn environment_beats_file_and_overrides_beat_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let env = EnvConfig {
        database_url: Some("postgresql://env@localhost/fga".into()),
        request_timeout: Some("10s".into()),
        max_concurrent_requests: Some("8".into()),
        max_requests_per_run: Some("50".into()),
        ..EnvConfig::default()
    };
    let overrides = ConfigOverrides {
        max_concurrent_requests: Some(2),
        ..ConfigOverrides::default()
    };

    let config = loader(&path)
        .with_overrides(overrides)
        .load_with_env(env)
        .unwrap()
        .config;

    assert_eq!(
        config.database.url.as_deref(),
        Some("postgresql://env@localhost/fga")
    );
    assert_eq!(config.flickr.request_timeout, Duration::from_secs(10));
    assert_eq!(config.processor.max_requests_per_run, Some(50));
    assert_eq!(config.processor.max_concurrent_requests, 2);
}

#[test]
fn defaults_apply_without_a_file_and_missing_settings_warn() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let load = loader(&path).load_with_env(EnvConfig::default()).unwrap();

    assert_eq!(load.config.processor.max_concurrent_requests, 1);
    assert_eq!(load.config.processor.max_requests_per_run, None);
    assert_eq!(
        load.config.processor.abandoned_attempt_after,
        Duration::from_secs(6 * 3600)
    );
    assert_eq!(load.config.flickr.request_timeout, Duration::from_secs(30));
    assert_eq!(load.warnings.items.len(), 3);
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[processor]\nmax_workers = 3\n");

    let err = loader(&path).load_with_env(EnvConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigLoadError::ConfigParse { .. }));
}

#[test]
fn malformed_environment_values_name_the_variable() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let env = EnvConfig {
        abandoned_attempt_after: Some("forever".into()),
        ..EnvConfig::default()
    };
    let err = loader(&path).load_with_env(env).unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::InvalidDuration {
            key: "FGA_ABANDONED_ATTEMPT_AFTER",
            ..
        }
    ));
}

#[test]
fn guard_rails_reject_excessive_concurrency() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[processor]\nmax_concurrent_requests = 64\n");

    let err = loader(&path).load_with_env(EnvConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ConfigLoadError::GuardRail(ConfigGuardRailError::ConcurrencyOutOfRange {
            value: 64
        })
    ));
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let err = loader(&missing)
        .load_with_env(EnvConfig::default())
        .unwrap_err();
    assert!(matches!(err, ConfigLoadError::ConfigFileIo { .. }));
}

#[test]
fn invalid_endpoint_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let env = EnvConfig {
        endpoint: Some("not a url".into()),
        ..EnvConfig::default()
    };
    let err = loader(&path).load_with_env(env).unwrap_err();
    assert!(matches!(err, ConfigLoadError::InvalidEndpoint { .. }));
}

#[test]
fn environment_only_load_warns_about_the_missing_file() {
    let env = EnvConfig {
        database_url: Some("postgresql://fga@localhost/fga".into()),
        app_credentials: Some("/srv/fga/app.json".into()),
        user_credentials: Some(vec!["/srv/fga/ada.json".into()]),
        ..EnvConfig::default()
    };

    let load = ConfigLoader::new()
        .with_env_file(None)
        .load_with_env(env)
        .unwrap();

    assert!(load.config.metadata.config_path.is_none());
    assert_eq!(load.warnings.items.len(), 1);
    assert!(load.warnings.items[0].message.contains("fga.toml"));
    assert!(load.warnings.items[0].hint.is_some());
}
