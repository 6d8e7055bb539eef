use std::time::Duration;

use thiserror::Error;

use crate::constants::{
    MAX_CONCURRENT_REQUESTS_LIMIT, MIN_ABANDONED_ATTEMPT_AFTER,
};
use crate::models::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error(
        "processor.max_concurrent_requests must be between 1 and 32 (got {value})"
    )]
    ConcurrencyOutOfRange { value: usize },
    #[error("flickr.request_timeout must be greater than zero")]
    ZeroRequestTimeout,
    #[error(
        "processor.abandoned_attempt_after must be at least 1h (got {value:?})"
    )]
    AbandonedWindowTooShort { value: Duration },
    #[error("no Flickr app credentials configured (flickr.app_credentials)")]
    MissingAppCredentials,
    #[error("no Flickr user credentials configured (flickr.user_credentials)")]
    NoUserCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint(
        &mut self,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

/// Reject settings that can never work and collect warnings for the rest.
///
/// Missing credentials and database settings are only warnings here since
/// some commands need neither; see [`ensure_flickr_ready`].
pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let processor = &config.processor;
    if processor.max_concurrent_requests == 0
        || processor.max_concurrent_requests > MAX_CONCURRENT_REQUESTS_LIMIT
    {
        return Err(ConfigGuardRailError::ConcurrencyOutOfRange {
            value: processor.max_concurrent_requests,
        });
    }
    if config.flickr.request_timeout.is_zero() {
        return Err(ConfigGuardRailError::ZeroRequestTimeout);
    }
    if processor.abandoned_attempt_after < MIN_ABANDONED_ATTEMPT_AFTER {
        return Err(ConfigGuardRailError::AbandonedWindowTooShort {
            value: processor.abandoned_attempt_after,
        });
    }

    let mut warnings = ConfigWarnings::default();
    if config.database.url.is_none() {
        warnings.push_with_hint(
            "no database URL configured",
            "set DATABASE_URL or [database] url in fga.toml",
        );
    }
    if config.flickr.app_credentials.is_none() {
        warnings.push_with_hint(
            "no Flickr app credentials configured",
            "set FGA_APP_CREDENTIALS or [flickr] app_credentials",
        );
    }
    if config.flickr.user_credentials.is_empty() {
        warnings.push_with_hint(
            "no Flickr user credentials configured",
            "set FGA_USER_CREDENTIALS or [flickr] user_credentials",
        );
    }
    if processor.max_requests_per_run == Some(0) {
        warnings.push("processor.max_requests_per_run is 0; runs will not process anything");
    }
    Ok(warnings)
}

/// Commands that talk to Flickr need both credential kinds.
pub fn ensure_flickr_ready(config: &Config) -> Result<(), ConfigGuardRailError> {
    if config.flickr.app_credentials.is_none() {
        return Err(ConfigGuardRailError::MissingAppCredentials);
    }
    if config.flickr.user_credentials.is_empty() {
        return Err(ConfigGuardRailError::NoUserCredentials);
    }
    Ok(())
}
