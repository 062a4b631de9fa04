//! Trailing-edge debouncer.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use voltmart_core::error::SyncError;

use crate::query::Query;

/// Latest applied outcome of a [`DebouncedQuery`].
#[derive(Debug)]
pub struct QuerySnapshot<P, R> {
    /// Params of the applied response
    pub params: Option<P>,
    /// Last successful result
    pub result: Option<Arc<R>>,
    /// Error from the latest response, cleared by the next success
    pub error: Option<Arc<SyncError>>,
    /// Trigger generation the applied response belongs to
    pub generation: u64,
    /// True while an invocation is scheduled but has not fired
    pub pending: bool,
    /// True while at least one fired invocation has not returned
    pub in_flight: bool,
}

impl<P, R> Default for QuerySnapshot<P, R> {
    fn default() -> Self {
        Self {
            params: None,
            result: None,
            error: None,
            generation: 0,
            pending: false,
            in_flight: false,
        }
    }
}

impl<P: Clone, R> Clone for QuerySnapshot<P, R> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            generation: self.generation,
            pending: self.pending,
            in_flight: self.in_flight,
        }
    }
}

/// Counters for a [`DebouncedQuery`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Calls to `trigger`
    pub triggered: u64,
    /// Invocations that fired and reached the query
    pub executed: u64,
    /// Responses dropped because a newer trigger had arrived
    pub discarded: u64,
    /// Pending invocations dropped by `cancel` or by drop
    pub cancelled: u64,
}

/// The scheduled, not yet fired invocation.
struct Pending {
    generation: u64,
    cancel: CancellationToken,
    fire_now: CancellationToken,
}

struct Shared<P, R> {
    pending: Mutex<Option<Pending>>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    updates: watch::Sender<QuerySnapshot<P, R>>,
    triggered: AtomicU64,
    executed: AtomicU64,
    discarded: AtomicU64,
    cancelled: AtomicU64,
}

// Lock order is `pending` then `updates`. Changes to `pending` are published
// before the lock is released, and `in_flight` is read inside the watch
// write lock, so the last publisher always sees the latest counter.
impl<P, R> Shared<P, R> {
    fn in_flight_now(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn publish_in_flight(&self) {
        self.updates.send_modify(|s| s.in_flight = self.in_flight_now());
    }
}

/// Fires a wrapped query only after `delay` of inactivity.
///
/// Each [`trigger`](Self::trigger) cancels the pending invocation, if any,
/// and schedules a new one with the latest params. At most one invocation is
/// pending at a time.
///
/// A fired invocation is not cancelled by later triggers. Its response is
/// applied only if no trigger arrived after it; otherwise it is discarded and
/// counted in [`QueryStats::discarded`].
///
/// Must be used from within a Tokio runtime. Dropping the debouncer cancels
/// the pending invocation.
pub struct DebouncedQuery<P, Q>
where
    P: Clone + Send + Sync + 'static,
    Q: Query<P>,
{
    delay: Duration,
    query: Arc<Q>,
    shared: Arc<Shared<P, Q::Output>>,
}

impl<P, Q> DebouncedQuery<P, Q>
where
    P: Clone + Send + Sync + 'static,
    Q: Query<P>,
{
    /// Wraps `query` with a quiet period of `delay`.
    pub fn new(delay: Duration, query: Q) -> Self {
        let (updates, _) = watch::channel(QuerySnapshot::default());
        Self {
            delay,
            query: Arc::new(query),
            shared: Arc::new(Shared {
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                updates,
                triggered: AtomicU64::new(0),
                executed: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
                cancelled: AtomicU64::new(0),
            }),
        }
    }

    /// Schedules the query with `params`, replacing any pending invocation.
    pub fn trigger(&self, params: P) {
        let cancel = CancellationToken::new();
        let fire_now = CancellationToken::new();

        let generation = {
            let mut pending = self.shared.pending.lock();
            if let Some(previous) = pending.take() {
                previous.cancel.cancel();
                debug!(generation = previous.generation, "Replaced pending query");
            }
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *pending = Some(Pending {
                generation,
                cancel: cancel.clone(),
                fire_now: fire_now.clone(),
            });
            self.shared.updates.send_modify(|s| s.pending = true);
            generation
        };
        self.shared.triggered.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(fire_after(
            self.delay,
            generation,
            params,
            cancel,
            fire_now,
            Arc::clone(&self.query),
            Arc::clone(&self.shared),
        ));
    }

    /// Drops the pending invocation without running it.
    ///
    /// Returns `false` if nothing was pending. Fired invocations are not
    /// affected.
    pub fn cancel(&self) -> bool {
        let pending = {
            let mut slot = self.shared.pending.lock();
            let Some(pending) = slot.take() else {
                return false;
            };
            self.shared.updates.send_modify(|s| s.pending = false);
            pending
        };
        pending.cancel.cancel();
        self.shared.cancelled.fetch_add(1, Ordering::Relaxed);
        debug!(generation = pending.generation, "Cancelled pending query");
        true
    }

    /// Fires the pending invocation now instead of waiting out the delay.
    ///
    /// Returns `false` if nothing was pending.
    pub fn flush(&self) -> bool {
        match self.shared.pending.lock().as_ref() {
            Some(pending) => {
                pending.fire_now.cancel();
                true
            }
            None => false,
        }
    }

    /// True while an invocation is scheduled but has not fired.
    pub fn is_pending(&self) -> bool {
        self.shared.pending.lock().is_some()
    }

    /// True while a fired invocation has not returned.
    pub fn is_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Generation of the most recent trigger.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }

    /// The configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> QuerySnapshot<P, Q::Output> {
        self.shared.updates.borrow().clone()
    }

    /// Subscribes to snapshots, published on every state change.
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot<P, Q::Output>> {
        self.shared.updates.subscribe()
    }

    /// Returns the counters.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            triggered: self.shared.triggered.load(Ordering::Relaxed),
            executed: self.shared.executed.load(Ordering::Relaxed),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
            cancelled: self.shared.cancelled.load(Ordering::Relaxed),
        }
    }
}

impl<P, Q> Drop for DebouncedQuery<P, Q>
where
    P: Clone + Send + Sync + 'static,
    Q: Query<P>,
{
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<P, Q> std::fmt::Debug for DebouncedQuery<P, Q>
where
    P: Clone + Send + Sync + 'static,
    Q: Query<P>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedQuery")
            .field("delay", &self.delay)
            .field("generation", &self.generation())
            .field("pending", &self.is_pending())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Waits out the quiet period, then runs the query if this invocation is
/// still the pending one.
#[instrument(skip_all, fields(generation = generation))]
async fn fire_after<P, Q>(
    delay: Duration,
    generation: u64,
    params: P,
    cancel: CancellationToken,
    fire_now: CancellationToken,
    query: Arc<Q>,
    shared: Arc<Shared<P, Q::Output>>,
) where
    P: Clone + Send + Sync + 'static,
    Q: Query<P>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        _ = fire_now.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }

    // A trigger racing the timer may have replaced us after the sleep ended.
    {
        let mut pending = shared.pending.lock();
        if pending.as_ref().map(|p| p.generation) != Some(generation) {
            return;
        }
        *pending = None;
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        shared.updates.send_modify(|s| {
            s.pending = false;
            s.in_flight = shared.in_flight_now();
        });
    }

    shared.executed.fetch_add(1, Ordering::Relaxed);
    debug!("Firing debounced query");

    let outcome = query.run(params.clone()).await;
    shared.in_flight.fetch_sub(1, Ordering::SeqCst);

    let latest = shared.generation.load(Ordering::SeqCst);
    if latest != generation {
        shared.discarded.fetch_add(1, Ordering::Relaxed);
        debug!(latest, "Discarding response to a superseded trigger");
        shared.publish_in_flight();
        return;
    }

    match outcome {
        Ok(result) => {
            shared.updates.send_modify(|s| {
                s.params = Some(params);
                s.result = Some(Arc::new(result));
                s.error = None;
                s.generation = generation;
                s.in_flight = shared.in_flight_now();
            });
        }
        Err(err) => {
            warn!(error = %err, "Debounced query failed");
            shared.updates.send_modify(|s| {
                s.params = Some(params);
                s.error = Some(Arc::new(err));
                s.generation = generation;
                s.in_flight = shared.in_flight_now();
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::time::{sleep, Instant};
    use voltmart_core::error::Result;
    use voltmart_core::traits::decode_all;
    use voltmart_core::types::{GeoPoint, Listing, MapRegion};
    use voltmart_remote::{fixtures, MemoryDataSource};

    type Calls = Arc<Mutex<Vec<(&'static str, Instant)>>>;

    /// Records every call. Params starting with "slow" take a second to
    /// answer and "fail" fails.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Calls,
    }

    #[async_trait]
    impl Query<&'static str> for Recorder {
        type Output = usize;

        async fn run(&self, params: &'static str) -> Result<usize> {
            self.calls.lock().push((params, Instant::now()));
            let latency = if params.starts_with("slow") { 1000 } else { 10 };
            sleep(Duration::from_millis(latency)).await;
            if params == "fail" {
                return Err(SyncError::Network("offline".into()));
            }
            Ok(params.len())
        }
    }

    fn debounced(delay_ms: u64) -> (DebouncedQuery<&'static str, Recorder>, Calls) {
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        (DebouncedQuery::new(Duration::from_millis(delay_ms), recorder), calls)
    }

    fn recorded(calls: &Calls) -> Vec<(&'static str, Instant)> {
        calls.lock().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_edge_fires_latest_params() {
        let (query, calls) = debounced(500);
        let start = Instant::now();

        query.trigger("A");
        sleep(Duration::from_millis(200)).await;
        query.trigger("B");
        sleep(Duration::from_secs(2)).await;

        let calls = recorded(&calls);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "B");
        let fired_after = calls[0].1 - start;
        assert!(fired_after >= Duration::from_millis(700));
        assert!(fired_after < Duration::from_millis(710));

        let snapshot = query.snapshot();
        assert_eq!(snapshot.params, Some("B"));
        assert_eq!(snapshot.result.as_deref(), Some(&1));
        assert_eq!(snapshot.generation, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_triggers_coalesce_into_one_call() {
        const DRAG: [&str; 6] = ["r1", "r2", "r3", "r4", "r5", "r6"];
        let (query, calls) = debounced(500);

        for region in DRAG {
            query.trigger(region);
            sleep(Duration::from_millis(100)).await;
        }
        assert!(query.is_pending());
        sleep(Duration::from_secs(2)).await;

        let calls = recorded(&calls);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "r6");
        assert_eq!(
            query.stats(),
            QueryStats {
                triggered: 6,
                executed: 1,
                discarded: 0,
                cancelled: 0,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_gaps_fire_each_trigger() {
        let (query, calls) = debounced(300);

        query.trigger("first");
        sleep(Duration::from_secs(1)).await;
        query.trigger("second");
        sleep(Duration::from_secs(1)).await;

        let names: Vec<_> = recorded(&calls).into_iter().map(|(p, _)| p).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_execution() {
        let (query, calls) = debounced(500);

        query.trigger("A");
        sleep(Duration::from_millis(100)).await;
        assert!(query.cancel());
        assert!(!query.is_pending());
        assert!(!query.cancel());

        sleep(Duration::from_secs(2)).await;
        assert!(recorded(&calls).is_empty());
        assert_eq!(query.stats().cancelled, 1);
        assert!(!query.snapshot().pending);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_snapshot_agrees_with_state_under_contention() {
        let (query, _calls) = debounced(0);
        let query = Arc::new(query);

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let query = Arc::clone(&query);
                tokio::spawn(async move {
                    for i in 0..200 {
                        query.trigger("r");
                        if (i + worker) % 3 == 0 {
                            query.cancel();
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.await.unwrap();
        }

        // Real time: fired queries answer after 10ms.
        sleep(Duration::from_millis(500)).await;
        let snapshot = query.snapshot();
        assert!(!query.is_pending());
        assert_eq!(snapshot.pending, query.is_pending());
        assert!(!query.is_in_flight());
        assert_eq!(snapshot.in_flight, query.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_publishes_pending_before_returning() {
        let (query, _calls) = debounced(500);
        let mut rx = query.subscribe();

        query.trigger("A");
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().pending);

        assert!(query.cancel());
        assert!(!rx.borrow_and_update().pending);
        assert!(!query.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_does_not_abort_fired_query() {
        let (query, calls) = debounced(100);

        query.trigger("slow");
        sleep(Duration::from_millis(200)).await;
        assert!(query.is_in_flight());
        assert!(!query.cancel());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(recorded(&calls).len(), 1);
        assert_eq!(query.snapshot().result.as_deref(), Some(&4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let (query, calls) = debounced(100);

        // Fires at 100ms, answers at 1100ms.
        query.trigger("slow-old");
        sleep(Duration::from_millis(300)).await;
        assert!(query.is_in_flight());

        // Fires at 400ms, answers at 410ms.
        query.trigger("new");
        sleep(Duration::from_millis(200)).await;
        assert_eq!(query.snapshot().params, Some("new"));

        sleep(Duration::from_secs(2)).await;
        let snapshot = query.snapshot();
        assert_eq!(snapshot.params, Some("new"));
        assert_eq!(snapshot.result.as_deref(), Some(&3));
        assert_eq!(snapshot.generation, 2);
        assert!(!snapshot.in_flight);

        assert_eq!(recorded(&calls).len(), 2);
        let stats = query.stats();
        assert_eq!(stats.executed, 2);
        assert_eq!(stats.discarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_fires_without_waiting() {
        let (query, calls) = debounced(10_000);
        let start = Instant::now();

        assert!(!query.flush());
        query.trigger("now");
        assert!(query.flush());
        sleep(Duration::from_millis(50)).await;

        let calls = recorded(&calls);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1 - start < Duration::from_millis(10));
        assert!(!query.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_result() {
        let (query, _) = debounced(100);

        query.trigger("ok");
        sleep(Duration::from_secs(1)).await;
        query.trigger("fail");
        sleep(Duration::from_secs(1)).await;

        let snapshot = query.snapshot();
        assert_eq!(snapshot.params, Some("fail"));
        assert_eq!(snapshot.result.as_deref(), Some(&2));
        assert!(snapshot.error.as_ref().is_some_and(|e| e.is_recoverable()));

        query.trigger("ok");
        sleep(Duration::from_secs(1)).await;
        assert!(query.snapshot().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_receive_results() {
        let (query, _) = debounced(250);
        let mut updates = query.subscribe();

        query.trigger("watch");
        assert!(updates.borrow_and_update().pending);

        let snapshot = updates
            .wait_for(|s| s.result.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.params, Some("watch"));
        assert_eq!(snapshot.result.as_deref(), Some(&5));
        assert!(!snapshot.pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (query, calls) = debounced(500);
        query.trigger("A");
        drop(query);

        sleep(Duration::from_secs(2)).await;
        assert!(recorded(&calls).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_drag_over_memory_source() {
        let source = Arc::new(MemoryDataSource::new());
        fixtures::seed_marketplace(&source, 60).unwrap();

        let query = DebouncedQuery::new(Duration::from_millis(750), {
            let source = source.clone();
            move |region: MapRegion| {
                let source = source.clone();
                async move { decode_all::<Listing>(source.fetch_in_region(region, 100).await?) }
            }
        });

        // Drag from Hamburg towards Berlin in small steps.
        let mut region = MapRegion::around(GeoPoint::new(53.55, 9.99), 0.5, 0.5).unwrap();
        let target = MapRegion::around(GeoPoint::new(52.52, 13.40), 0.5, 0.5).unwrap();
        let steps = 12;
        let (d_lat, d_lon) = (
            (target.center().lat - region.center().lat) / steps as f64,
            (target.center().lon - region.center().lon) / steps as f64,
        );
        for _ in 0..steps {
            region = region.panned(d_lat, d_lon);
            query.trigger(region);
            sleep(Duration::from_millis(50)).await;
        }
        sleep(Duration::from_secs(2)).await;

        assert_eq!(source.fetch_in_region_calls(), 1);
        let snapshot = query.snapshot();
        let listings = snapshot.result.expect("region result");
        assert!(!listings.is_empty());
        assert!(listings.iter().all(|l| region.contains(l.location)));
    }
}
