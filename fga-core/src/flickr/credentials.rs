use std::fmt;

use fga_model::{ModelError, UserId};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Application API key pair issued by Flickr.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AppCredentials {
    pub api_key: String,
    pub api_key_secret: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("api_key", &self.api_key)
            .field("api_key_secret", &"<redacted>")
            .finish()
    }
}

/// OAuth access token granted by one Flickr user to the application.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct UserCredentials {
    pub user_oauth_token: String,
    pub user_oauth_token_secret: String,
    #[serde(default)]
    pub user_fullname: String,
    #[serde(default)]
    pub username: String,
    pub user_nsid: String,
}

impl UserCredentials {
    pub fn user_id(&self) -> Result<UserId, ModelError> {
        UserId::parse(&self.user_nsid)
    }
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("user_nsid", &self.user_nsid)
            .field("username", &self.username)
            .field("user_oauth_token", &"<redacted>")
            .field("user_oauth_token_secret", &"<redacted>")
            .finish()
    }
}
