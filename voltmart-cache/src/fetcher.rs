//! Read-through access to the typed cache.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use voltmart_core::error::Result;
use voltmart_core::traits::{Cacheable, RemoteDataSource};

use crate::cache::TypedCache;

/// Pairs a shared [`TypedCache`] with the backend that fills it.
///
/// Fetch failures are returned as-is and never cached; the cache is only
/// written after a successful decode.
pub struct CachedFetcher<S> {
    cache: Arc<TypedCache>,
    source: S,
}

impl<S: RemoteDataSource> CachedFetcher<S> {
    /// Creates a fetcher over a shared cache.
    pub fn new(cache: Arc<TypedCache>, source: S) -> Self {
        Self { cache, source }
    }

    /// Returns the shared cache.
    pub fn cache(&self) -> &Arc<TypedCache> {
        &self.cache
    }

    /// Returns the cached value, or fetches, stores, and returns it.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn get_or_fetch<T>(&self, id: &str) -> Result<T>
    where
        T: Cacheable + DeserializeOwned,
    {
        if let Some(hit) = self.cache.get::<T>(id) {
            debug!("Cache hit");
            return Ok(hit);
        }
        debug!("Cache miss, fetching");
        self.refetch(id).await
    }

    /// Fetches from the backend and overwrites the cached entry.
    ///
    /// Use when a hit is older than the caller tolerates.
    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn refetch<T>(&self, id: &str) -> Result<T>
    where
        T: Cacheable + DeserializeOwned,
    {
        let raw = self.source.fetch_by_id(T::KIND, id).await.map_err(|err| {
            warn!(error = %err, "Fetch failed");
            err
        })?;
        let value: T = serde_json::from_value(raw)?;
        self.cache.set(id, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use voltmart_core::types::Profile;
    use voltmart_core::SyncError;
    use voltmart_remote::MemoryDataSource;

    fn make_profile(name: &str) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            display_name: name.into(),
            avatar_url: None,
            active_listings: 2,
            joined_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_miss_fetches_then_hits() {
        let source = Arc::new(MemoryDataSource::new());
        let profile = make_profile("Ada");
        source.put_entity(&profile).unwrap();

        let fetcher = CachedFetcher::new(Arc::new(TypedCache::new()), source.clone());
        let id = profile.id.to_string();

        let first: Profile = fetcher.get_or_fetch(&id).await.unwrap();
        let second: Profile = fetcher.get_or_fetch(&id).await.unwrap();

        assert_eq!(first, profile);
        assert_eq!(second, profile);
        assert_eq!(source.fetch_by_id_calls(), 1);
        assert_eq!(fetcher.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_refetch_overwrites() {
        let source = Arc::new(MemoryDataSource::new());
        let mut profile = make_profile("Ada");
        source.put_entity(&profile).unwrap();

        let fetcher = CachedFetcher::new(Arc::new(TypedCache::new()), source.clone());
        let id = profile.id.to_string();
        let _: Profile = fetcher.get_or_fetch(&id).await.unwrap();

        profile.display_name = "Ada L.".into();
        source.put_entity(&profile).unwrap();

        let fresh: Profile = fetcher.refetch(&id).await.unwrap();
        assert_eq!(fresh.display_name, "Ada L.");
        assert_eq!(
            fetcher.cache().get::<Profile>(&id).unwrap().display_name,
            "Ada L."
        );
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_empty() {
        let source = Arc::new(MemoryDataSource::new());
        let profile = make_profile("Ada");
        source.put_entity(&profile).unwrap();
        source.fail_next(1);

        let fetcher = CachedFetcher::new(Arc::new(TypedCache::new()), source.clone());
        let id = profile.id.to_string();

        let err = fetcher.get_or_fetch::<Profile>(&id).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(fetcher.cache().is_empty());

        // Retry succeeds once the backend recovers.
        assert!(fetcher.get_or_fetch::<Profile>(&id).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_shape_is_decoding_failure() {
        let source = Arc::new(MemoryDataSource::new());
        source.put_raw("Profile", "broken", serde_json::json!({"display_name": 7}));

        let fetcher = CachedFetcher::new(Arc::new(TypedCache::new()), source);
        let err = fetcher.get_or_fetch::<Profile>("broken").await.unwrap_err();
        assert!(matches!(err, SyncError::Decoding(_)));
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let fetcher = CachedFetcher::new(Arc::new(TypedCache::new()), MemoryDataSource::new());
        let err = fetcher.get_or_fetch::<Profile>("nope").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }
}
