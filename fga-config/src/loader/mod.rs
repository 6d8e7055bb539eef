pub mod db_url;
pub mod error;

use std::path::{Path, PathBuf};

use fga_core::flickr::rest::FLICKR_REST_ENDPOINT;
use tracing::debug;
use url::Url;

use crate::constants::{
    DEFAULT_CONFIG_CANDIDATES, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    Config, ConfigMetadata, DatabaseConfig, FlickrConfig, ProcessorConfig,
};
use crate::util::{parse_duration, parse_number};
use crate::validation::{ConfigWarnings, apply_guard_rails};
use db_url::resolve_database_url;
use error::ConfigLoadError;
use fga_core::run::DEFAULT_ABANDONED_ATTEMPT_AFTER;

/// Values supplied on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub max_concurrent_requests: Option<usize>,
    pub max_requests_per_run: Option<usize>,
}

/// A validated configuration plus the non-fatal findings of validation.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_file: Some(PathBuf::from(".env")),
            overrides: ConfigOverrides::default(),
        }
    }

    /// Use an explicit config file; it must exist.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// `None` disables `.env` loading.
    pub fn with_env_file(mut self, path: Option<PathBuf>) -> Self {
        self.env_file = path;
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load `.env`, gather the process environment and compose.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match self.env_file.as_deref() {
            Some(path) => load_env_file(path)?,
            None => false,
        };
        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose from an explicit environment snapshot.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let config_path = self.resolve_config_path(&env)?;
        let file = match config_path.as_deref() {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        let base_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "no fga.toml found; using environment variables only",
                "create fga.toml or pass --config",
            );
        }

        let mut config = compose(&env, &file, base_dir.as_deref())?;
        config.metadata.config_path = config_path;
        self.apply_overrides(&mut config);

        warnings.extend(apply_guard_rails(&config)?);
        Ok(ConfigLoad { config, warnings })
    }

    fn resolve_config_path(
        &self,
        env: &EnvConfig,
    ) -> Result<Option<PathBuf>, ConfigLoadError> {
        if let Some(path) = self.config_path.clone().or(env.config_path.clone()) {
            if !path.is_file() {
                return Err(ConfigLoadError::ConfigFileIo {
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "config file does not exist",
                    ),
                    path,
                });
            }
            return Ok(Some(path));
        }

        Ok(DEFAULT_CONFIG_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file()))
    }

    fn apply_overrides(&self, config: &mut Config) {
        let overrides = &self.overrides;
        if let Some(url) = overrides.database_url.clone() {
            config.database.url = Some(url);
        }
        if let Some(n) = overrides.max_concurrent_requests {
            config.processor.max_concurrent_requests = n;
        }
        if let Some(n) = overrides.max_requests_per_run {
            config.processor.max_requests_per_run = Some(n);
        }
    }
}

fn load_env_file(path: &Path) -> Result<bool, ConfigLoadError> {
    match dotenvy::from_path(path) {
        Ok(()) => {
            debug!(path = %path.display(), "loaded env file");
            Ok(true)
        }
        Err(err) if err.not_found() => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::ConfigFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    toml::from_str(&raw).map_err(|source| ConfigLoadError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Paths in the config file are relative to the file itself.
fn relative_to(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

fn compose(
    env: &EnvConfig,
    file: &FileConfig,
    base_dir: Option<&Path>,
) -> Result<Config, ConfigLoadError> {
    let database = DatabaseConfig {
        url: resolve_database_url(env, &file.database)?,
    };

    let app_credentials = env.app_credentials.clone().or_else(|| {
        file.flickr
            .app_credentials
            .as_deref()
            .map(|p| relative_to(base_dir, p))
    });
    let user_credentials = match (&env.user_credentials, &file.flickr.user_credentials)
    {
        (Some(paths), _) => paths.clone(),
        (None, Some(paths)) => {
            paths.iter().map(|p| relative_to(base_dir, p)).collect()
        }
        (None, None) => Vec::new(),
    };

    let request_timeout = match env
        .request_timeout
        .as_deref()
        .map(|raw| ("FGA_REQUEST_TIMEOUT", raw))
        .or(file
            .flickr
            .request_timeout
            .as_deref()
            .map(|raw| ("flickr.request_timeout", raw)))
    {
        Some((key, raw)) => parse_duration(key, raw)?,
        None => DEFAULT_REQUEST_TIMEOUT,
    };

    let endpoint_raw = env
        .endpoint
        .as_deref()
        .or(file.flickr.endpoint.as_deref())
        .unwrap_or(FLICKR_REST_ENDPOINT);
    let endpoint = Url::parse(endpoint_raw).map_err(|source| {
        ConfigLoadError::InvalidEndpoint {
            value: endpoint_raw.to_string(),
            source,
        }
    })?;

    let max_concurrent_requests = match env.max_concurrent_requests.as_deref() {
        Some(raw) => parse_number("FGA_MAX_CONCURRENT_REQUESTS", raw)?,
        None => file
            .processor
            .max_concurrent_requests
            .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS),
    };
    let max_requests_per_run = match env.max_requests_per_run.as_deref() {
        Some(raw) => Some(parse_number("FGA_MAX_REQUESTS_PER_RUN", raw)?),
        None => file.processor.max_requests_per_run,
    };
    let abandoned_attempt_after = match env
        .abandoned_attempt_after
        .as_deref()
        .map(|raw| ("FGA_ABANDONED_ATTEMPT_AFTER", raw))
        .or(file
            .processor
            .abandoned_attempt_after
            .as_deref()
            .map(|raw| ("processor.abandoned_attempt_after", raw)))
    {
        Some((key, raw)) => parse_duration(key, raw)?,
        None => DEFAULT_ABANDONED_ATTEMPT_AFTER,
    };

    Ok(Config {
        database,
        flickr: FlickrConfig {
            app_credentials,
            user_credentials,
            request_timeout,
            endpoint,
        },
        processor: ProcessorConfig {
            max_concurrent_requests,
            max_requests_per_run,
            abandoned_attempt_after,
        },
        metadata: ConfigMetadata::default(),
    })
}
