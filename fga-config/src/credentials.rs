//! Reads the JSON credential files the Flickr client signs requests with.

use std::fs;
use std::path::{Path, PathBuf};

use fga_core::flickr::credentials::{AppCredentials, UserCredentials};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::ConfigLoadError;

/// `{"api_key": ..., "api_key_secret": ...}`
pub fn load_app_credentials(
    path: &Path,
) -> Result<AppCredentials, ConfigLoadError> {
    read_json(path)
}

/// One file per authorised user, as written by the OAuth handshake.
pub fn load_user_credentials(
    paths: &[PathBuf],
) -> Result<Vec<UserCredentials>, ConfigLoadError> {
    paths
        .iter()
        .map(|path| {
            let creds: UserCredentials = read_json(path)?;
            debug!(
                path = %path.display(),
                user = %creds.user_nsid,
                "loaded user credentials"
            );
            Ok(creds)
        })
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::CredentialsIo {
            path: path.to_path_buf(),
            source,
        }
    })?;
    serde_json::from_str(&raw).map_err(|source| {
        ConfigLoadError::CredentialsParse {
            path: path.to_path_buf(),
            source,
        }
    })
}
