use std::str::FromStr;
use std::time::Duration;

use crate::ConfigLoadError;

pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parse a humantime duration such as `"30s"` or `"6h"`.
pub fn parse_duration(
    key: &'static str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| {
        ConfigLoadError::InvalidDuration {
            key,
            value: raw.to_string(),
            source,
        }
    })
}

pub fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigLoadError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
