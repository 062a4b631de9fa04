//! Feed configuration, snapshots, and outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltmart_core::constants::{DEFAULT_PAGE_SIZE, FEED_REFRESH_COOLDOWN, LISTINGS_COLLECTION};
use voltmart_core::SyncConfig;

/// Feed configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Remote collection to page through
    pub collection: String,
    /// Items per page
    pub page_size: u64,
    /// Minimum time between refreshes
    pub refresh_cooldown: Duration,
}

impl FeedConfig {
    /// Creates a configuration for `collection` with default paging.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            page_size: DEFAULT_PAGE_SIZE,
            refresh_cooldown: FEED_REFRESH_COOLDOWN,
        }
    }

    /// Configuration for the marketplace listings feed.
    pub fn listings() -> Self {
        Self::new(LISTINGS_COLLECTION)
    }

    /// Builds a configuration from the shared sync settings.
    pub fn from_sync(collection: impl Into<String>, config: &SyncConfig) -> Self {
        Self::new(collection)
            .page_size(config.page_size)
            .refresh_cooldown(config.feed_refresh_cooldown)
    }

    /// Sets the page size. Zero is treated as one.
    pub fn page_size(mut self, size: u64) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Sets the refresh cooldown.
    pub fn refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }
}

/// Immutable snapshot of a feed.
///
/// `items` is shared between snapshots; cloning a snapshot does not copy the
/// list.
#[derive(Debug)]
pub struct FeedState<T> {
    /// Accumulated items in backend order
    pub items: Arc<Vec<T>>,
    /// Items per page
    pub page_size: u64,
    /// Pages loaded since the last refresh (zero-based cursor of the next page)
    pub current_page: u64,
    /// False once a short page has been received
    pub has_more: bool,
    /// When the last successful refresh completed
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// True while a page load or refresh is in flight
    pub is_loading: bool,
}

impl<T> FeedState<T> {
    /// Empty state before the first load. Zero page size is treated as one.
    pub fn new(page_size: u64) -> Self {
        Self {
            items: Arc::new(Vec::new()),
            page_size: page_size.max(1),
            current_page: 0,
            has_more: true,
            last_refresh_at: None,
            is_loading: false,
        }
    }

    /// Inclusive index range of the next page.
    pub fn next_range(&self) -> (u64, u64) {
        let from = self.current_page * self.page_size;
        (from, from + self.page_size - 1)
    }

    /// Number of items loaded.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the feed is empty and cannot load more.
    pub fn is_exhausted_empty(&self) -> bool {
        self.items.is_empty() && !self.has_more
    }
}

impl<T> Clone for FeedState<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            page_size: self.page_size,
            current_page: self.current_page,
            has_more: self.has_more,
            last_refresh_at: self.last_refresh_at,
            is_loading: self.is_loading,
        }
    }
}

/// Result of [`PaginatedFeed::load_next_page`](crate::PaginatedFeed::load_next_page).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended.
    Loaded {
        /// Items appended
        count: usize,
        /// Whether another page may exist
        has_more: bool,
    },
    /// The feed is exhausted; nothing was requested.
    Exhausted,
    /// Another load or refresh is running; nothing was requested.
    InFlight,
    /// A refresh started while this page was in flight; the page was dropped.
    Superseded,
}

/// Result of [`PaginatedFeed::refresh`](crate::PaginatedFeed::refresh).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The list was replaced with the first page.
    Refreshed {
        /// Items in the new first page
        count: usize,
        /// Whether another page may exist
        has_more: bool,
    },
    /// The cooldown has not elapsed; nothing was requested.
    Throttled {
        /// Time until a refresh is permitted
        remaining: Duration,
    },
    /// A newer refresh started while this one was in flight.
    Superseded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_range() {
        let mut state: FeedState<u32> = FeedState::new(10);
        assert_eq!(state.next_range(), (0, 9));
        state.current_page = 3;
        assert_eq!(state.next_range(), (30, 39));
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let state: FeedState<u32> = FeedState::new(0);
        assert_eq!(state.page_size, 1);
        assert_eq!(state.next_range(), (0, 0));
    }

    #[test]
    fn test_clone_shares_items() {
        let state: FeedState<u32> = FeedState {
            items: Arc::new(vec![1, 2, 3]),
            ..FeedState::new(10)
        };
        let copy = state.clone();
        assert!(Arc::ptr_eq(&state.items, &copy.items));
    }

    #[test]
    fn test_config_from_sync() {
        let sync = SyncConfig::default().with_page_size(25);
        let config = FeedConfig::from_sync("listings", &sync);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.refresh_cooldown, Duration::from_secs(10));
        assert_eq!(FeedConfig::listings().page_size(0).page_size, 1);
    }
}
