use std::fmt;

use uuid::Uuid;

use crate::error::ModelError;

/// Opaque token identifying a submitted group-add request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestId(pub Uuid);

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestId {
    pub fn new() -> Self {
        RequestId(Uuid::now_v7())
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single row in the attempt ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttemptId(pub Uuid);

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptId {
    pub fn new() -> Self {
        AttemptId(Uuid::now_v7())
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Flickr identifiers are opaque strings (NSIDs such as `12345678@N00`, or
// numeric photo ids). Only emptiness and embedded whitespace are rejected.
macro_rules! flickr_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(
            feature = "serde",
            derive(serde::Serialize, serde::Deserialize),
            serde(try_from = "String", into = "String")
        )]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, ModelError> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(ModelError::InvalidId(format!(
                        "{} cannot be empty",
                        $label
                    )));
                }
                if trimmed.chars().any(char::is_whitespace) {
                    return Err(ModelError::InvalidId(format!(
                        "{} '{}' contains whitespace",
                        $label, trimmed
                    )));
                }
                Ok(Self(trimmed.to_owned()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

        }

        impl TryFrom<String> for $name {
            type Error = ModelError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::parse(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

flickr_id!(
    /// Flickr NSID of the user on whose behalf a request is executed.
    UserId,
    "user id"
);
flickr_id!(
    /// Flickr photo id.
    PictureId,
    "picture id"
);
flickr_id!(
    /// Flickr group NSID.
    GroupId,
    "group id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flickr_ids_are_trimmed() {
        let group = GroupId::parse("  34427469792@N01 ").unwrap();
        assert_eq!(group.as_str(), "34427469792@N01");
    }

    #[test]
    fn flickr_ids_reject_empty_and_whitespace() {
        assert!(UserId::parse("   ").is_err());
        assert!(PictureId::parse("123 456").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialized_flickr_ids_are_validated() {
        let group: GroupId = serde_json::from_str(r#"" 34427469792@N01 ""#).unwrap();
        assert_eq!(group.as_str(), "34427469792@N01");
        assert_eq!(serde_json::to_string(&group).unwrap(), r#""34427469792@N01""#);

        assert!(serde_json::from_str::<UserId>(r#""   ""#).is_err());
        assert!(serde_json::from_str::<PictureId>(r#""123 456""#).is_err());
    }
}
