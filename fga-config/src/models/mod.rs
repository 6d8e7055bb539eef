pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use fga_core::RunOptions;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub flickr: FlickrConfig,
    pub processor: ProcessorConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Fully resolved connection URL, password included.
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FlickrConfig {
    pub app_credentials: Option<PathBuf>,
    pub user_credentials: Vec<PathBuf>,
    pub request_timeout: Duration,
    pub endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub max_concurrent_requests: usize,
    pub max_requests_per_run: Option<usize>,
    pub abandoned_attempt_after: Duration,
}

impl ProcessorConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_concurrent_requests: self.max_concurrent_requests,
            max_requests_per_run: self.max_requests_per_run,
            abandoned_attempt_after: self.abandoned_attempt_after,
            ..RunOptions::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
