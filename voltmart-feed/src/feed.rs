//! Paginated feed over a remote collection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use voltmart_core::clock::{Clock, SystemClock};
use voltmart_core::error::{Result, SyncError};
use voltmart_core::traits::{decode_all, RemoteDataSource};
use voltmart_gate::RefreshGate;

use crate::state::{FeedConfig, FeedState, LoadOutcome, RefreshOutcome};

/// Mutable feed internals, guarded by one lock.
struct Inner<T> {
    state: FeedState<T>,
    /// Bumped by every refresh and reset; a fetch only applies if it still matches.
    generation: u64,
    /// Generation of the fetch currently marked as loading.
    loading: Option<u64>,
}

/// Incremental loader for a remote collection.
///
/// Owned by one view-model. Methods take `&self` so the feed can be shared
/// with spawned tasks, but at most one page load runs at a time: a second
/// [`load_next_page`](Self::load_next_page) while one is pending returns
/// [`LoadOutcome::InFlight`] without touching the network.
///
/// Failures leave the state exactly as it was, so retrying re-requests the
/// same range.
pub struct PaginatedFeed<T, S> {
    source: S,
    config: FeedConfig,
    gate: RefreshGate,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<T>>,
    updates: watch::Sender<FeedState<T>>,
}

impl<T, S> PaginatedFeed<T, S>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    S: RemoteDataSource,
{
    /// Creates a feed backed by the system clock.
    pub fn new(source: S, config: FeedConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Creates a feed reading time from `clock` for refresh cooldowns and
    /// timestamps.
    pub fn with_clock(source: S, config: FeedConfig, clock: Arc<dyn Clock>) -> Self {
        let state = FeedState::new(config.page_size.max(1));
        let (updates, _) = watch::channel(state.clone());
        Self {
            gate: RefreshGate::with_clock(config.refresh_cooldown, clock.clone()),
            source,
            config,
            clock,
            inner: Mutex::new(Inner {
                state,
                generation: 0,
                loading: None,
            }),
            updates,
        }
    }

    /// Returns the current snapshot.
    pub fn state(&self) -> FeedState<T> {
        self.inner.lock().state.clone()
    }

    /// Returns the loaded items.
    pub fn items(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.inner.lock().state.items)
    }

    /// Subscribes to snapshots published after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<FeedState<T>> {
        self.updates.subscribe()
    }

    /// The configuration this feed was built with.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The gate guarding [`refresh`](Self::refresh).
    pub fn refresh_gate(&self) -> &RefreshGate {
        &self.gate
    }

    /// Fetches and appends the next page.
    ///
    /// No-op when the feed is exhausted or another fetch is in flight. On
    /// success the items are appended, `has_more` becomes false if the page
    /// was short, and the cursor advances by one.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn load_next_page(&self) -> Result<LoadOutcome> {
        let (generation, from, to) = {
            let mut inner = self.inner.lock();
            if !inner.state.has_more {
                debug!("Feed exhausted, not loading");
                return Ok(LoadOutcome::Exhausted);
            }
            if inner.loading.is_some() {
                debug!("Fetch already in flight");
                return Ok(LoadOutcome::InFlight);
            }
            let generation = inner.generation;
            inner.loading = Some(generation);
            inner.state.is_loading = true;
            let (from, to) = inner.state.next_range();
            self.publish(&inner.state);
            (generation, from, to)
        };
        let _loading = LoadingGuard {
            feed: self,
            generation,
        };

        let page: Vec<T> = self.fetch_page(from, to).await?;
        let count = page.len();

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(from, to, "Discarding page fetched before a refresh");
            return Ok(LoadOutcome::Superseded);
        }

        let page_size = inner.state.page_size;
        let state = &mut inner.state;
        Arc::make_mut(&mut state.items).extend(page);
        state.has_more = count as u64 >= page_size;
        state.current_page += 1;

        debug!(
            count,
            page = state.current_page,
            has_more = state.has_more,
            "Appended page"
        );
        Ok(LoadOutcome::Loaded {
            count,
            has_more: state.has_more,
        })
    }

    /// Replaces the list with a fresh first page, subject to the cooldown.
    ///
    /// A refresh supersedes any page load still in flight. When throttled,
    /// nothing is requested and the remaining cooldown is returned. Only a
    /// successful fetch starts the cooldown.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let permit = match self.gate.acquire_permit() {
            Ok(permit) => permit,
            Err(SyncError::Throttled { remaining }) => {
                debug!(remaining_ms = remaining.as_millis() as u64, "Refresh throttled");
                return Ok(RefreshOutcome::Throttled { remaining });
            }
            Err(err) => return Err(err),
        };

        let (generation, to) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.loading = Some(inner.generation);
            inner.state.is_loading = true;
            self.publish(&inner.state);
            (inner.generation, inner.state.page_size - 1)
        };
        let _loading = LoadingGuard {
            feed: self,
            generation,
        };

        // A failed fetch drops the permit, so the user can retry at once.
        let page: Vec<T> = self.fetch_page(0, to).await?;
        permit.commit();
        let count = page.len();
        let refreshed_at = self.clock.now();

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!("Discarding refresh superseded by a newer one");
            return Ok(RefreshOutcome::Superseded);
        }

        let state = &mut inner.state;
        state.items = Arc::new(page);
        state.has_more = count as u64 >= state.page_size;
        state.current_page = 1;
        state.last_refresh_at = Some(refreshed_at);

        info!(count, has_more = state.has_more, "Feed refreshed");
        Ok(RefreshOutcome::Refreshed {
            count,
            has_more: state.has_more,
        })
    }

    /// Clears all items and the refresh cooldown, e.g. on sign-out.
    ///
    /// Any fetch still in flight is discarded when it completes.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.loading = None;
        inner.state = FeedState::new(inner.state.page_size);
        self.gate.reset();
        self.publish(&inner.state);
    }

    /// When the last successful refresh completed.
    pub fn last_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().state.last_refresh_at
    }

    async fn fetch_page(&self, from: u64, to: u64) -> Result<Vec<T>> {
        let raw = self
            .source
            .fetch_range(&self.config.collection, from, to)
            .await
            .map_err(|err| {
                warn!(from, to, error = %err, "Page fetch failed");
                err
            })?;
        decode_all(raw).map_err(|err| {
            warn!(from, to, error = %err, "Page decode failed");
            err
        })
    }

    fn publish(&self, state: &FeedState<T>) {
        self.updates.send_replace(state.clone());
    }
}

/// Clears the loading marker when a fetch finishes, fails, or is dropped
/// mid-flight, as long as no newer fetch has taken over.
struct LoadingGuard<'a, T, S>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    S: RemoteDataSource,
{
    feed: &'a PaginatedFeed<T, S>,
    generation: u64,
}

impl<T, S> Drop for LoadingGuard<'_, T, S>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    S: RemoteDataSource,
{
    fn drop(&mut self) {
        let mut inner = self.feed.inner.lock();
        if inner.loading == Some(self.generation) {
            inner.loading = None;
            inner.state.is_loading = false;
        }
        self.feed.publish(&inner.state);
    }
}
