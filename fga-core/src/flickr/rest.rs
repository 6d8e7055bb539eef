use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use fga_model::{GroupId, PictureId, UserId};
use reqwest::Method;
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::credentials::{AppCredentials, UserCredentials};
use super::oauth::{SigningNonce, sign_request};
use super::{ErrorCategory, FlickrApi, FlickrError};

pub const FLICKR_REST_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

const GROUPS_PER_PAGE: u32 = 400;
const MAX_GROUP_PAGES: u32 = 50;

/// A group the user can add photos to, as listed by Flickr.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSummary {
    pub nsid: String,
    #[serde(default)]
    pub name: String,
}

impl GroupSummary {
    /// `name (nsid)`, the format operators paste into request sets.
    pub fn display_line(&self) -> String {
        format!("{} ({})", self.name, self.nsid)
    }
}

/// Signed JSON client for the Flickr REST endpoint.
pub struct FlickrRestClient {
    http: reqwest::Client,
    endpoint: Url,
    app: AppCredentials,
    users: HashMap<UserId, UserCredentials>,
}

impl fmt::Debug for FlickrRestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlickrRestClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FlickrRestClient {
    pub fn new(
        endpoint: Url,
        app: AppCredentials,
        users: Vec<UserCredentials>,
        request_timeout: Duration,
    ) -> Result<Self, FlickrError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("fga/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut by_user = HashMap::with_capacity(users.len());
        for creds in users {
            let user_id = creds.user_id().map_err(|e| {
                FlickrError::Decode(format!("invalid user credentials: {e}"))
            })?;
            if by_user.insert(user_id.clone(), creds).is_some() {
                warn!(user = %user_id, "duplicate credentials; keeping the last one");
            }
        }

        Ok(Self {
            http,
            endpoint,
            app,
            users: by_user,
        })
    }

    /// All groups the user may add photos to, across every result page.
    pub async fn list_user_group_details(
        &self,
        user: &UserId,
    ) -> Result<Vec<GroupSummary>, FlickrError> {
        let mut groups = Vec::new();
        let mut page = 1u32;

        loop {
            let response: PoolGroupsResponse = self
                .call(
                    Method::GET,
                    "flickr.groups.pools.getGroups",
                    user,
                    vec![
                        ("page".into(), page.to_string()),
                        ("per_page".into(), GROUPS_PER_PAGE.to_string()),
                    ],
                    |_| ErrorCategory::Other,
                )
                .await?;

            let pages = response.groups.pages.max(1);
            groups.extend(response.groups.group);

            if page >= pages || page >= MAX_GROUP_PAGES {
                break;
            }
            page += 1;
        }

        debug!(user = %user, count = groups.len(), "fetched group memberships");
        Ok(groups)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        http_method: Method,
        api_method: &str,
        owner: &UserId,
        mut params: Vec<(String, String)>,
        categorize: fn(u32) -> ErrorCategory,
    ) -> Result<T, FlickrError> {
        let creds = self
            .users
            .get(owner)
            .ok_or_else(|| FlickrError::MissingCredentials(owner.clone()))?;

        params.extend([
            ("method".to_owned(), api_method.to_owned()),
            ("format".to_owned(), "json".to_owned()),
            ("nojsoncallback".to_owned(), "1".to_owned()),
        ]);
        let signed = sign_request(
            http_method.as_str(),
            self.endpoint.as_str(),
            params,
            &self.app,
            creds,
            &SigningNonce::fresh(),
        )?;

        let request = if http_method == Method::POST {
            self.http.post(self.endpoint.clone()).form(&signed)
        } else {
            self.http.get(self.endpoint.clone()).query(&signed)
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FlickrError::Transport(format!(
                "{api_method} returned HTTP {status}"
            )));
        }

        let body = response.text().await?;
        decode_envelope(&body, categorize)
    }
}

/// Decode Flickr's `{"stat": "ok" | "fail", ...}` envelope.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    body: &str,
    categorize: fn(u32) -> ErrorCategory,
) -> Result<T, FlickrError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FlickrError::Decode(format!("invalid json: {e}")))?;

    match value.get("stat").and_then(Value::as_str) {
        Some("ok") => serde_json::from_value(value)
            .map_err(|e| FlickrError::Decode(e.to_string())),
        Some("fail") => {
            let code = value.get("code").and_then(lenient_u64).unwrap_or(0);
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned();
            let code = u32::try_from(code).unwrap_or(u32::MAX);
            Err(FlickrError::Api {
                category: categorize(code),
                code,
                message,
            })
        }
        other => Err(FlickrError::Decode(format!(
            "missing or unknown stat field: {other:?}"
        ))),
    }
}

fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_u64(&value)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(1))
}

#[derive(Debug, Deserialize)]
struct PoolGroupsResponse {
    groups: PoolGroups,
}

#[derive(Debug, Deserialize)]
struct PoolGroups {
    #[serde(default = "one", deserialize_with = "lenient_u32")]
    pages: u32,
    #[serde(default)]
    group: Vec<GroupSummary>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct PhotoContexts {
    #[serde(default)]
    pool: Vec<PoolContext>,
}

#[derive(Debug, Deserialize)]
struct PoolContext {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Empty {}

fn to_group_ids<I>(raw: I) -> HashSet<GroupId>
where
    I: IntoIterator<Item = String>,
{
    raw.into_iter()
        .filter_map(|id| match GroupId::parse(&id) {
            Ok(group) => Some(group),
            Err(e) => {
                warn!(error = %e, "ignoring malformed group id in response");
                None
            }
        })
        .collect()
}

#[async_trait]
impl FlickrApi for FlickrRestClient {
    async fn add_photo_to_group(
        &self,
        owner: &UserId,
        picture: &PictureId,
        group: &GroupId,
    ) -> Result<(), FlickrError> {
        let _: Empty = self
            .call(
                Method::POST,
                "flickr.groups.pools.add",
                owner,
                vec![
                    ("photo_id".into(), picture.to_string()),
                    ("group_id".into(), group.to_string()),
                ],
                ErrorCategory::for_pool_add,
            )
            .await?;
        Ok(())
    }

    async fn list_groups_for_user(
        &self,
        user: &UserId,
    ) -> Result<HashSet<GroupId>, FlickrError> {
        let groups = self.list_user_group_details(user).await?;
        Ok(to_group_ids(groups.into_iter().map(|g| g.nsid)))
    }

    async fn list_groups_for_picture(
        &self,
        owner: &UserId,
        picture: &PictureId,
    ) -> Result<HashSet<GroupId>, FlickrError> {
        let contexts: PhotoContexts = self
            .call(
                Method::GET,
                "flickr.photos.getAllContexts",
                owner,
                vec![("photo_id".into(), picture.to_string())],
                |_| ErrorCategory::Other,
            )
            .await?;
        Ok(to_group_ids(contexts.pool.into_iter().map(|p| p.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_failure_is_categorised() {
        let body = r#"{"stat":"fail","code":5,"message":"Photo limit reached"}"#;
        let err = decode_envelope::<Empty>(body, ErrorCategory::for_pool_add)
            .unwrap_err();
        assert_eq!(
            err,
            FlickrError::Api {
                category: ErrorCategory::Throttled,
                code: 5,
                message: "Photo limit reached".into(),
            }
        );
    }

    #[test]
    fn string_codes_are_accepted() {
        let body = r#"{"stat":"fail","code":"6","message":"Added to queue"}"#;
        let err = decode_envelope::<Empty>(body, ErrorCategory::for_pool_add)
            .unwrap_err();
        assert_eq!(err.category(), Some(ErrorCategory::QueuedForModeration));
    }

    #[test]
    fn ok_envelope_decodes_pool_groups() {
        let body = r#"{
            "groups": {"page": 1, "pages": "2", "group": [
                {"nsid": "34427469792@N01", "name": "FlickrCentral"},
                {"nsid": "52240293230@N01", "name": "Black and White"}
            ]},
            "stat": "ok"
        }"#;
        let parsed: PoolGroupsResponse =
            decode_envelope(body, |_| ErrorCategory::Other).unwrap();
        assert_eq!(parsed.groups.pages, 2);
        assert_eq!(parsed.groups.group.len(), 2);
        assert_eq!(
            parsed.groups.group[0].display_line(),
            "FlickrCentral (34427469792@N01)"
        );
    }

    #[test]
    fn contexts_without_pools_yield_empty_set() {
        let body = r#"{"set": [{"id": "721", "title": "Holiday"}], "stat": "ok"}"#;
        let parsed: PhotoContexts =
            decode_envelope(body, |_| ErrorCategory::Other).unwrap();
        assert!(to_group_ids(parsed.pool.into_iter().map(|p| p.id)).is_empty());
    }

    #[test]
    fn missing_stat_is_a_decode_error() {
        let err = decode_envelope::<Empty>("{}", |_| ErrorCategory::Other)
            .unwrap_err();
        assert!(matches!(err, FlickrError::Decode(_)));
    }
}
