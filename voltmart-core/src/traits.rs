//! Common traits for the Voltmart sync layer.
//!
//! These traits define the seams between the sync components and the
//! networking collaborator, enabling in-memory backends for tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::types::CacheKey;

// ═══════════════════════════════════════════════════════════════════════════════
// REMOTE DATA SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the backend.
///
/// Implementations own transport, authentication, and timeouts. Payloads are
/// returned as raw JSON documents; the sync layer decodes them into domain
/// types so shape mismatches surface as decoding failures.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// Fetches the inclusive index range `[from, to]` of a collection.
    ///
    /// May return fewer than `to - from + 1` items only at the end of the
    /// collection. Partial final pages are never padded.
    async fn fetch_range(&self, collection: &str, from: u64, to: u64) -> Result<Vec<Value>>;

    /// Fetches a single entity of the given kind.
    async fn fetch_by_id(&self, kind: &str, id: &str) -> Result<Value>;
}

#[async_trait]
impl<S: RemoteDataSource + ?Sized> RemoteDataSource for Arc<S> {
    async fn fetch_range(&self, collection: &str, from: u64, to: u64) -> Result<Vec<Value>> {
        (**self).fetch_range(collection, from, to).await
    }

    async fn fetch_by_id(&self, kind: &str, id: &str) -> Result<Value> {
        (**self).fetch_by_id(kind, id).await
    }
}

/// Decodes a batch of raw documents, failing on the first mismatch.
pub fn decode_all<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Into::into))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHEABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// A domain snapshot that can be stored in the typed cache.
///
/// `KIND` names the cache partition and the remote entity type, so one
/// implementation ties the cache key to the `fetch_by_id` call that fills it.
pub trait Cacheable: Clone + Send + Sync + 'static {
    /// Semantic type name, e.g. `"Profile"`.
    const KIND: &'static str;

    /// Entity identifier within the kind.
    fn cache_id(&self) -> String;

    /// Composite `Kind:id` key.
    fn cache_key(&self) -> CacheKey {
        CacheKey::new(Self::KIND, self.cache_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_decode_all() {
        let values = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})];
        let items: Vec<Item> = decode_all(values).unwrap();
        assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn test_decode_all_rejects_bad_shape() {
        let values = vec![serde_json::json!({"id": 1}), serde_json::json!({"name": "x"})];
        let err = decode_all::<Item>(values).unwrap_err();
        assert!(err.is_decoding());
    }
}
