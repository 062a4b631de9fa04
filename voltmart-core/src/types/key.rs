//! Composite cache keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::CACHE_KEY_SEPARATOR;
use crate::error::{Result, SyncError};

/// A cache key made of a semantic type name and an entity id.
///
/// Renders as `Kind:id`, e.g. `Profile:3f0c...`. The id may itself contain
/// the separator; only the first one splits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    kind: String,
    id: String,
}

impl CacheKey {
    /// Creates a key from its parts.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Parses the `Kind:id` string form.
    pub fn parse(raw: &str) -> Result<Self> {
        let (kind, id) = raw
            .split_once(CACHE_KEY_SEPARATOR)
            .ok_or_else(|| SyncError::InvalidPayload(format!("cache key '{raw}' has no kind")))?;
        let kind = kind.trim();
        let id = id.trim();
        if kind.is_empty() || id.is_empty() {
            return Err(SyncError::InvalidPayload(format!(
                "cache key '{raw}' has an empty kind or id"
            )));
        }
        Ok(Self::new(kind, id))
    }

    /// Returns the semantic type name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the entity id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind, CACHE_KEY_SEPARATOR, self.id)
    }
}

impl std::str::FromStr for CacheKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_display_and_parse() {
        let key = CacheKey::new("Profile", "123");
        assert_eq!(key.to_string(), "Profile:123");
        assert_eq!(CacheKey::parse("Profile:123").unwrap(), key);
    }

    #[test]
    fn test_parse_splits_on_first_separator() {
        let key: CacheKey = "Chart:tesla:model-3".parse().unwrap();
        assert_eq!(key.kind(), "Chart");
        assert_eq!(key.id(), "tesla:model-3");
    }

    #[test_case("Profile" ; "no separator")]
    #[test_case(":123" ; "empty kind")]
    #[test_case("Profile:  " ; "blank id")]
    #[test_case("" ; "empty")]
    fn test_parse_rejects_malformed(raw: &str) {
        let err = CacheKey::parse(raw).unwrap_err();
        assert!(err.is_decoding());
    }

    proptest::proptest! {
        #[test]
        fn prop_ids_with_separators_survive_parse(kind in "[A-Za-z]{1,12}", id in "[a-z0-9:-]{0,24}[a-z0-9]") {
            let key = CacheKey::new(kind.clone(), id.clone());
            let parsed = CacheKey::parse(&key.to_string()).unwrap();
            proptest::prop_assert_eq!(parsed.kind(), kind.as_str());
            proptest::prop_assert_eq!(parsed.id(), id.as_str());
        }
    }
}
