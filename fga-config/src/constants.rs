use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "FGA_CONFIG";

/// Searched in order when no config path is given.
pub const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["fga.toml", "config/fga.toml"];

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 1;
pub const MAX_CONCURRENT_REQUESTS_LIMIT: usize = 32;
pub const MIN_ABANDONED_ATTEMPT_AFTER: Duration = Duration::from_secs(60 * 60);
