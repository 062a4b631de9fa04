//! In-memory backend.
//!
//! Thread-safe storage suitable for tests, demos, and offline development.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use voltmart_core::constants::LISTINGS_COLLECTION;
use voltmart_core::error::{Result, SyncError};
use voltmart_core::traits::{decode_all, Cacheable, RemoteDataSource};
use voltmart_core::types::{Listing, MapRegion};

/// A recorded `fetch_range` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeRequest {
    /// Collection name
    pub collection: String,
    /// First index (inclusive)
    pub from: u64,
    /// Last index (inclusive)
    pub to: u64,
}

/// In-memory backend.
///
/// # Storage
///
/// - Collections: ordered documents, index 0 is the newest
/// - Entities: documents keyed by kind and id
///
/// # Fault injection
///
/// - [`set_latency`](Self::set_latency) delays every call
/// - [`fail_next`](Self::fail_next) makes the next N calls fail with a
///   network error
///
/// Every call is counted, so tests can assert that a code path stayed off
/// the network.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    /// collection name → ordered documents
    collections: DashMap<String, Vec<Value>>,
    /// (kind, id) → document
    entities: DashMap<(String, String), Value>,
    /// Artificial per-call delay
    latency: RwLock<Duration>,
    /// Calls left to fail
    pending_failures: AtomicU64,
    range_calls: AtomicU64,
    by_id_calls: AtomicU64,
    region_calls: AtomicU64,
    range_log: RwLock<Vec<RangeRequest>>,
}

impl MemoryDataSource {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Makes the next `count` calls fail with [`SyncError::Network`].
    pub fn fail_next(&self, count: u64) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Replaces a collection's contents.
    pub fn set_collection<T: Serialize>(&self, collection: &str, items: &[T]) -> Result<()> {
        let docs = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.collections.insert(collection.to_string(), docs);
        Ok(())
    }

    /// Appends documents to the end (oldest side) of a collection.
    pub fn push_items<T: Serialize>(&self, collection: &str, items: &[T]) -> Result<usize> {
        let docs = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        entry.extend(docs);
        Ok(entry.len())
    }

    /// Inserts a document at the front (newest side) of a collection.
    pub fn push_front<T: Serialize>(&self, collection: &str, item: &T) -> Result<()> {
        let doc = serde_json::to_value(item)?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(0, doc);
        Ok(())
    }

    /// Removes the document at `index`, if present.
    pub fn remove_at(&self, collection: &str, index: usize) -> Option<Value> {
        let mut docs = self.collections.get_mut(collection)?;
        (index < docs.len()).then(|| docs.remove(index))
    }

    /// Stores a typed entity under its cache kind and id.
    pub fn put_entity<T: Cacheable + Serialize>(&self, entity: &T) -> Result<()> {
        let doc = serde_json::to_value(entity)?;
        self.put_raw(T::KIND, &entity.cache_id(), doc);
        Ok(())
    }

    /// Stores an arbitrary document, including malformed ones.
    pub fn put_raw(&self, kind: &str, id: &str, doc: Value) {
        self.entities.insert((kind.to_string(), id.to_string()), doc);
    }

    /// Moves a listing to the top of the listings collection.
    pub fn promote_listing(&self, id: Uuid, at: DateTime<Utc>) -> Result<Listing> {
        let mut docs = self
            .collections
            .get_mut(LISTINGS_COLLECTION)
            .ok_or_else(|| SyncError::UnknownCollection(LISTINGS_COLLECTION.into()))?;

        let index = docs
            .iter()
            .position(|doc| doc.get("id").and_then(Value::as_str) == Some(id.to_string().as_str()))
            .ok_or_else(|| SyncError::NotFound {
                kind: Listing::KIND.into(),
                id: id.to_string(),
            })?;

        let mut listing: Listing = serde_json::from_value(docs.remove(index))?;
        listing.promoted_at = Some(at);
        docs.insert(0, serde_json::to_value(&listing)?);
        debug!(%id, from_index = index, "Promoted listing");
        Ok(listing)
    }

    /// Returns listings located inside `region`, newest first, capped at `limit`.
    #[instrument(skip(self))]
    pub async fn fetch_in_region(&self, region: MapRegion, limit: usize) -> Result<Vec<Value>> {
        self.region_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        region.validate()?;

        let docs = self
            .collections
            .get(LISTINGS_COLLECTION)
            .map(|d| d.value().clone())
            .unwrap_or_default();
        let listings: Vec<Listing> = decode_all(docs)?;

        listings
            .into_iter()
            .filter(|l| region.contains(l.location))
            .take(limit)
            .map(|l| serde_json::to_value(l).map_err(SyncError::from))
            .collect()
    }

    /// Number of documents in a collection.
    pub fn collection_len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|d| d.len()).unwrap_or(0)
    }

    /// Number of `fetch_range` calls so far.
    pub fn fetch_range_calls(&self) -> u64 {
        self.range_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_by_id` calls so far.
    pub fn fetch_by_id_calls(&self) -> u64 {
        self.by_id_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_in_region` calls so far.
    pub fn fetch_in_region_calls(&self) -> u64 {
        self.region_calls.load(Ordering::SeqCst)
    }

    /// Every `fetch_range` request in call order.
    pub fn range_requests(&self) -> Vec<RangeRequest> {
        self.range_log.read().clone()
    }

    async fn simulate_network(&self) -> Result<()> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let fail = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(SyncError::Network("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteDataSource for MemoryDataSource {
    #[instrument(skip(self))]
    async fn fetch_range(&self, collection: &str, from: u64, to: u64) -> Result<Vec<Value>> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.range_log.write().push(RangeRequest {
            collection: collection.to_string(),
            from,
            to,
        });
        self.simulate_network().await?;

        if to < from {
            return Ok(Vec::new());
        }

        let docs = self
            .collections
            .get(collection)
            .ok_or_else(|| SyncError::UnknownCollection(collection.to_string()))?;

        let start = usize::try_from(from).unwrap_or(usize::MAX).min(docs.len());
        let end = usize::try_from(to)
            .unwrap_or(usize::MAX)
            .saturating_add(1)
            .min(docs.len());

        debug!(collection, from, to, returned = end - start, "Serving range");
        Ok(docs[start..end].to_vec())
    }

    #[instrument(skip(self))]
    async fn fetch_by_id(&self, kind: &str, id: &str) -> Result<Value> {
        self.by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;

        self.entities
            .get(&(kind.to_string(), id.to_string()))
            .map(|doc| doc.value().clone())
            .ok_or_else(|| SyncError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use voltmart_core::types::GeoPoint;

    #[tokio::test]
    async fn test_range_is_inclusive() {
        let source = MemoryDataSource::new();
        source.set_collection("n", &(0..25).collect::<Vec<u32>>()).unwrap();

        let page = source.fetch_range("n", 10, 19).await.unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0], 10);
        assert_eq!(page[9], 19);
    }

    #[tokio::test]
    async fn test_final_page_is_short() {
        let source = MemoryDataSource::new();
        source.set_collection("n", &(0..25).collect::<Vec<u32>>()).unwrap();

        assert_eq!(source.fetch_range("n", 20, 29).await.unwrap().len(), 5);
        assert!(source.fetch_range("n", 30, 39).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let source = MemoryDataSource::new();
        let err = source.fetch_range("missing", 0, 9).await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownCollection(_)));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let source = MemoryDataSource::new();
        source.set_collection("n", &[1u32, 2, 3]).unwrap();
        source.fail_next(2);

        assert!(source.fetch_range("n", 0, 2).await.is_err());
        assert!(source.fetch_range("n", 0, 2).await.is_err());
        assert!(source.fetch_range("n", 0, 2).await.is_ok());
        assert_eq!(source.fetch_range_calls(), 3);
        assert_eq!(source.range_requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let source = MemoryDataSource::new();
        source.set_collection("n", &[1u32]).unwrap();
        source.set_latency(Duration::from_millis(300));

        let start = tokio::time::Instant::now();
        source.fetch_range("n", 0, 0).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_promote_moves_to_front() {
        let source = MemoryDataSource::new();
        fixtures::seed_marketplace(&source, 5).unwrap();
        let target = fixtures::sample_listing(3);

        let promoted = source.promote_listing(target.id, Utc::now()).unwrap();
        assert!(promoted.promoted_at.is_some());

        let first: Listing =
            serde_json::from_value(source.fetch_range(LISTINGS_COLLECTION, 0, 0).await.unwrap()[0].clone())
                .unwrap();
        assert_eq!(first.id, target.id);
        assert_eq!(source.collection_len(LISTINGS_COLLECTION), 5);
    }

    #[tokio::test]
    async fn test_fetch_in_region_filters() {
        let source = MemoryDataSource::new();
        fixtures::seed_marketplace(&source, 40).unwrap();

        let everywhere = MapRegion::new(-90.0, -180.0, 90.0, 180.0).unwrap();
        assert_eq!(source.fetch_in_region(everywhere, 100).await.unwrap().len(), 40);
        assert_eq!(source.fetch_in_region(everywhere, 7).await.unwrap().len(), 7);

        let berlin = MapRegion::around(GeoPoint::new(52.52, 13.40), 1.0, 1.0).unwrap();
        let found: Vec<Listing> = decode_all(source.fetch_in_region(berlin, 100).await.unwrap()).unwrap();
        assert!(!found.is_empty());
        assert!(found.iter().all(|l| berlin.contains(l.location)));
        assert_eq!(source.fetch_in_region_calls(), 3);
    }

    #[tokio::test]
    async fn test_fetch_by_id() {
        let source = MemoryDataSource::new();
        source.put_raw("Profile", "1", serde_json::json!({"id": "1"}));

        assert!(source.fetch_by_id("Profile", "1").await.is_ok());
        let err = source.fetch_by_id("Profile", "2").await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
        assert_eq!(source.fetch_by_id_calls(), 2);
    }

    #[test]
    fn test_remove_at() {
        let source = MemoryDataSource::new();
        source.set_collection("n", &[1u32, 2, 3]).unwrap();
        assert_eq!(source.remove_at("n", 1), Some(serde_json::json!(2)));
        assert_eq!(source.remove_at("n", 5), None);
        assert_eq!(source.collection_len("n"), 2);
    }

    #[test]
    fn test_range_past_end_clamps() {
        let source = MemoryDataSource::new();
        source.set_collection("n", &[1u32, 2]).unwrap();
        let page = tokio_test::block_on(source.fetch_range("n", 0, 9)).unwrap();
        assert_eq!(page.len(), 2);
    }
}
