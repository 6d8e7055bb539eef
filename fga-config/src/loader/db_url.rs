use std::{fs::read_to_string, path::Path};

use url::Url;

use crate::{
    ConfigLoadError,
    models::sources::{EnvConfig, FileDatabaseConfig},
};

/// Resolve the Postgres connection URL.
///
/// `DATABASE_URL` wins, then the contents of `DATABASE_URL_FILE`, then the
/// file's `[database] url`. A password is only spliced into a file URL that
/// lacks one.
pub fn resolve_database_url(
    env: &EnvConfig,
    file_database: &FileDatabaseConfig,
) -> Result<Option<String>, ConfigLoadError> {
    if let Some(url) = env
        .database_url
        .clone()
        .filter(|value| !value.trim().is_empty())
    {
        return Ok(Some(url));
    }

    if let Some(path) = env.database_url_file.as_ref()
        && let Some(url) = read_secret_file(path)?
    {
        return Ok(Some(url));
    }

    let Some(stored_url) = file_database.url.as_deref() else {
        return Ok(None);
    };
    let trimmed = stored_url.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let mut parsed = Url::parse(trimmed)
        .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    if parsed.password().is_none()
        && let Some(password) = resolve_database_password(env, file_database)?
    {
        parsed
            .set_password(Some(&password))
            .map_err(|_| ConfigLoadError::InvalidDatabasePassword)?;
    }
    Ok(Some(parsed.to_string()))
}

pub fn resolve_database_password(
    env: &EnvConfig,
    file_database: &FileDatabaseConfig,
) -> Result<Option<String>, ConfigLoadError> {
    if let Some(password) = env
        .database_password
        .clone()
        .filter(|value| !value.trim().is_empty())
    {
        return Ok(Some(password));
    }

    for path in [
        env.database_password_file.as_ref(),
        file_database.password_file.as_ref(),
    ]
    .into_iter()
    .flatten()
    {
        if let Some(secret) = read_secret_file(path)? {
            return Ok(Some(secret));
        }
    }

    Ok(None)
}

pub fn read_secret_file(
    path: &Path,
) -> Result<Option<String>, ConfigLoadError> {
    let contents = read_to_string(path).map_err(|source| {
        ConfigLoadError::SecretFileIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
