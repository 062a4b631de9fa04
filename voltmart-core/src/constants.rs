//! Sync layer constants.
//!
//! Defaults for page sizes, cooldowns, and debounce delays. Every value here
//! can be overridden through [`SyncConfig`](crate::config::SyncConfig).

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// PAGINATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Number of listings requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest page size the backend will honour in one range request.
pub const MAX_PAGE_SIZE: u64 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// COOLDOWNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum time between two pull-to-refresh actions on a feed.
pub const FEED_REFRESH_COOLDOWN: Duration = Duration::from_secs(10);

/// Minimum time between two "bump to top" promotions of the same listing.
pub const LISTING_BUMP_COOLDOWN: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// DEBOUNCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Quiet period after the map camera stops moving before the region is queried.
pub const MAP_DEBOUNCE_DELAY: Duration = Duration::from_millis(750);

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Entries kept per cache partition before least-recently-used eviction.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Separator between the kind and id in a composite cache key.
pub const CACHE_KEY_SEPARATOR: char = ':';

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Remote collection holding marketplace listings, newest first.
pub const LISTINGS_COLLECTION: &str = "listings";
