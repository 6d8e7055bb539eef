//! Request-set import.
//!
//! Request sets map picture ids to lists of group entries. Only the first
//! whitespace-separated token of an entry is the group NSID; the rest is a
//! human-readable label:
//!
//! ```json
//! {"fga_request_set": {"53212": ["34427469792@N01 FlickrCentral"]}}
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use fga_model::{GroupId, ModelError, NewRequest, PictureId, UserId};
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid request set: {0}")]
    Json(#[from] serde_json::Error),

    #[error("picture {picture:?}: {source}")]
    InvalidId {
        picture: String,
        #[source]
        source: ModelError,
    },

    #[error("picture {picture}: empty group entry")]
    EmptyEntry { picture: String },
}

#[derive(Debug, Deserialize)]
struct RequestSetFile {
    fga_request_set: PictureEntries,
}

/// Picture entries in document order.
#[derive(Debug)]
struct PictureEntries(Vec<(String, Vec<String>)>);

impl<'de> Deserialize<'de> for PictureEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = PictureEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of picture ids to group entries")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<String>>()? {
                    entries.push(entry);
                }
                Ok(PictureEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parse a request-set document into requests owned by `user`.
///
/// Requests come out in the order the document lists them, which becomes
/// their submission order. Duplicate (picture, group) pairs are dropped.
pub fn parse_request_set(
    json: &str,
    user: &UserId,
) -> Result<Vec<NewRequest>, ImportError> {
    let file: RequestSetFile = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    let mut requests = Vec::new();
    for (raw_picture, entries) in file.fga_request_set.0 {
        let picture = PictureId::parse(&raw_picture).map_err(|source| {
            ImportError::InvalidId {
                picture: raw_picture.clone(),
                source,
            }
        })?;

        for entry in entries {
            let token = entry
                .split_whitespace()
                .next()
                .ok_or_else(|| ImportError::EmptyEntry {
                    picture: raw_picture.clone(),
                })?;
            let group = GroupId::parse(token).map_err(|source| {
                ImportError::InvalidId {
                    picture: raw_picture.clone(),
                    source,
                }
            })?;

            if seen.insert((picture.clone(), group.clone())) {
                requests.push(NewRequest::new(user.clone(), picture.clone(), group));
            }
        }
    }
    Ok(requests)
}

pub fn read_request_set(
    path: &Path,
    user: &UserId,
) -> Result<Vec<NewRequest>, ImportError> {
    let json = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_request_set(&json, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::parse("12345678@N00").unwrap()
    }

    #[test]
    fn group_id_is_first_token_of_entry() {
        let json = r#"{
            "fga_request_set": {
                "53212": [
                    "34427469792@N01   FlickrCentral",
                    "52240293230@N01 Black and White"
                ],
                "10001": ["99999999@N00"]
            }
        }"#;
        let requests = parse_request_set(json, &user()).unwrap();

        let pairs: Vec<(&str, &str)> = requests
            .iter()
            .map(|r| (r.picture_id.as_str(), r.group_id.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("53212", "34427469792@N01"),
                ("53212", "52240293230@N01"),
                ("10001", "99999999@N00"),
            ]
        );
        assert!(requests.iter().all(|r| r.user_id == user()));
    }

    #[test]
    fn pictures_keep_document_order() {
        let json = r#"{"fga_request_set": {
            "53212": ["g1@N01"],
            "9": ["g1@N01"],
            "10001": ["g1@N01"]
        }}"#;
        let pictures: Vec<String> = parse_request_set(json, &user())
            .unwrap()
            .into_iter()
            .map(|r| r.picture_id.as_str().to_owned())
            .collect();
        assert_eq!(pictures, ["53212", "9", "10001"]);
    }

    #[test]
    fn duplicate_entries_are_dropped() {
        let json = r#"{"fga_request_set": {"1": ["g@N01 a", "g@N01 b"]}}"#;
        assert_eq!(parse_request_set(json, &user()).unwrap().len(), 1);
    }

    #[test]
    fn blank_entries_are_rejected() {
        let json = r#"{"fga_request_set": {"1": ["   "]}}"#;
        let err = parse_request_set(json, &user()).unwrap_err();
        assert!(matches!(err, ImportError::EmptyEntry { picture } if picture == "1"));
    }

    #[test]
    fn missing_root_key_is_a_json_error() {
        let err = parse_request_set(r#"{"requests": {}}"#, &user()).unwrap_err();
        assert!(matches!(err, ImportError::Json(_)));
    }
}
