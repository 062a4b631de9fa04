//! Type-partitioned, bounded in-memory cache for Voltmart domain snapshots.
//!
//! One [`TypedCache`] is created per session and shared by every feature that
//! memoizes remote objects. Each semantic type gets its own LRU partition, so
//! clearing profiles on sign-out leaves chart data untouched and vice versa.
//!
//! Lookups are best-effort: an entry may be evicted at any time, so callers
//! always keep a fetch path. [`CachedFetcher`] packages that pattern.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod fetcher;

pub use cache::{CacheConfig, CacheStats, TypedCache};
pub use fetcher::CachedFetcher;
