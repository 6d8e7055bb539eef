use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::CONFIG_PATH_ENV;
use crate::util::{non_empty_var, parse_csv_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub flickr: FileFlickrConfig,
    #[serde(default)]
    pub processor: FileProcessorConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileFlickrConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_credentials: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_credentials: Option<Vec<PathBuf>>,
    /// Humantime string such as `"30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileProcessorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests_per_run: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned_attempt_after: Option<String>,
}

/// Environment-derived configuration values, kept raw until composition so
/// malformed values surface as load errors naming the variable.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub database_url: Option<String>,
    pub database_url_file: Option<PathBuf>,
    pub database_password: Option<String>,
    pub database_password_file: Option<PathBuf>,
    pub app_credentials: Option<PathBuf>,
    pub user_credentials: Option<Vec<PathBuf>>,
    pub request_timeout: Option<String>,
    pub endpoint: Option<String>,
    pub max_concurrent_requests: Option<String>,
    pub max_requests_per_run: Option<String>,
    pub abandoned_attempt_after: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var(CONFIG_PATH_ENV).map(PathBuf::from),
            database_url: non_empty_var("DATABASE_URL"),
            database_url_file: non_empty_var("DATABASE_URL_FILE")
                .map(PathBuf::from),
            database_password: non_empty_var("DATABASE_PASSWORD"),
            database_password_file: non_empty_var("DATABASE_PASSWORD_FILE")
                .map(PathBuf::from),
            app_credentials: non_empty_var("FGA_APP_CREDENTIALS")
                .map(PathBuf::from),
            user_credentials: parse_csv_var("FGA_USER_CREDENTIALS")
                .map(|paths| paths.into_iter().map(PathBuf::from).collect()),
            request_timeout: non_empty_var("FGA_REQUEST_TIMEOUT"),
            endpoint: non_empty_var("FGA_FLICKR_ENDPOINT"),
            max_concurrent_requests: non_empty_var("FGA_MAX_CONCURRENT_REQUESTS"),
            max_requests_per_run: non_empty_var("FGA_MAX_REQUESTS_PER_RUN"),
            abandoned_attempt_after: non_empty_var("FGA_ABANDONED_ATTEMPT_AFTER"),
        }
    }
}
