//! OAuth 1.0a request signing (HMAC-SHA1), as required by Flickr for
//! authenticated API calls.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::FlickrError;
use super::credentials::{AppCredentials, UserCredentials};

type HmacSha1 = Hmac<Sha1>;

/// Per-call values that must be unique (nonce) or current (timestamp).
#[derive(Debug, Clone)]
pub struct SigningNonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl SigningNonce {
    pub fn fresh() -> Self {
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Append the OAuth protocol parameters and signature to `params`.
pub fn sign_request(
    http_method: &str,
    url: &str,
    mut params: Vec<(String, String)>,
    app: &AppCredentials,
    user: &UserCredentials,
    nonce: &SigningNonce,
) -> Result<Vec<(String, String)>, FlickrError> {
    params.extend([
        ("oauth_consumer_key".to_owned(), app.api_key.clone()),
        ("oauth_nonce".to_owned(), nonce.nonce.clone()),
        ("oauth_signature_method".to_owned(), "HMAC-SHA1".to_owned()),
        ("oauth_timestamp".to_owned(), nonce.timestamp.to_string()),
        ("oauth_token".to_owned(), user.user_oauth_token.clone()),
        ("oauth_version".to_owned(), "1.0".to_owned()),
    ]);

    let base = signature_base_string(http_method, url, &params);
    let key = format!(
        "{}&{}",
        urlencoding::encode(&app.api_key_secret),
        urlencoding::encode(&user.user_oauth_token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| {
        FlickrError::Transport(format!("oauth signing key rejected: {e}"))
    })?;
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    params.push(("oauth_signature".to_owned(), signature));
    Ok(params)
}

/// RFC 5849 §3.4.1 signature base string.
pub fn signature_base_string(
    http_method: &str,
    url: &str,
    params: &[(String, String)],
) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        http_method.to_ascii_uppercase(),
        urlencoding::encode(url),
        urlencoding::encode(&normalized)
    )
}
