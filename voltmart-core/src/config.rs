//! Sync layer configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_PAGE_SIZE, FEED_REFRESH_COOLDOWN, LISTING_BUMP_COOLDOWN,
    MAP_DEBOUNCE_DELAY, MAX_PAGE_SIZE,
};
use crate::error::{Result, SyncError};

/// Tunables shared by the feed, gates, debouncer, and cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Items requested per page
    pub page_size: u64,
    /// Minimum time between two feed refreshes
    pub feed_refresh_cooldown: Duration,
    /// Minimum time between two bumps of the same listing
    pub listing_bump_cooldown: Duration,
    /// Quiet period before a map-region query fires
    pub map_debounce_delay: Duration,
    /// Entries kept per cache partition
    pub cache_capacity_per_type: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            feed_refresh_cooldown: FEED_REFRESH_COOLDOWN,
            listing_bump_cooldown: LISTING_BUMP_COOLDOWN,
            map_debounce_delay: MAP_DEBOUNCE_DELAY,
            cache_capacity_per_type: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Loads configuration from the environment (and `.env`, if present).
    ///
    /// Unset variables keep their defaults. Unparsable values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            page_size: env_or("VOLTMART_PAGE_SIZE", defaults.page_size),
            feed_refresh_cooldown: Duration::from_secs(env_or(
                "VOLTMART_FEED_COOLDOWN_SECS",
                defaults.feed_refresh_cooldown.as_secs(),
            )),
            listing_bump_cooldown: Duration::from_secs(env_or(
                "VOLTMART_BUMP_COOLDOWN_SECS",
                defaults.listing_bump_cooldown.as_secs(),
            )),
            map_debounce_delay: Duration::from_millis(env_or(
                "VOLTMART_DEBOUNCE_MS",
                defaults.map_debounce_delay.as_millis() as u64,
            )),
            cache_capacity_per_type: env_or(
                "VOLTMART_CACHE_CAPACITY",
                defaults.cache_capacity_per_type,
            ),
        }
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be greater than zero".into()));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(SyncError::Config(format!(
                "page_size {} exceeds backend limit {}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }
        if self.cache_capacity_per_type == 0 {
            return Err(SyncError::Config(
                "cache_capacity_per_type must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the feed refresh cooldown.
    pub fn with_feed_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.feed_refresh_cooldown = cooldown;
        self
    }

    /// Sets the listing bump cooldown.
    pub fn with_listing_bump_cooldown(mut self, cooldown: Duration) -> Self {
        self.listing_bump_cooldown = cooldown;
        self
    }

    /// Sets the map debounce delay.
    pub fn with_map_debounce_delay(mut self, delay: Duration) -> Self {
        self.map_debounce_delay = delay;
        self
    }

    /// Sets the per-partition cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity_per_type = capacity;
        self
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(variable = name, value = %raw, "Ignoring unparsable config value");
                default
            }
        },
        Err(_) => default,
    }
}
