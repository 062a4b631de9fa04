//! Per-entity cooldown gates.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use voltmart_core::clock::{Clock, SystemClock};
use voltmart_core::error::Result;

use crate::gate::RefreshGate;

/// A family of [`RefreshGate`]s sharing one cooldown, keyed by entity.
///
/// Bumping listing A never delays bumping listing B. Gates are created lazily
/// on first use.
pub struct KeyedRefreshGate {
    gates: DashMap<String, RefreshGate>,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
}

impl KeyedRefreshGate {
    /// Creates a keyed gate backed by the system clock.
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, Arc::new(SystemClock))
    }

    /// Creates a keyed gate reading time from `clock`.
    pub fn with_clock(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            gates: DashMap::new(),
            cooldown,
            clock,
        }
    }

    /// Attempts the action for `key`; see [`RefreshGate::try_acquire`].
    pub fn try_acquire(&self, key: &str) -> bool {
        let permitted = self
            .gates
            .entry(key.to_string())
            .or_insert_with(|| RefreshGate::with_clock(self.cooldown, self.clock.clone()))
            .try_acquire();
        if permitted {
            debug!(key, "Keyed action permitted");
        }
        permitted
    }

    /// Attempts the action for `key`, reporting denial as an error.
    pub fn acquire_or_throttled(&self, key: &str) -> Result<()> {
        self.gates
            .entry(key.to_string())
            .or_insert_with(|| RefreshGate::with_clock(self.cooldown, self.clock.clone()))
            .acquire_or_throttled()
    }

    /// Time left for `key`; zero for keys never acted on.
    pub fn time_remaining(&self, key: &str) -> Duration {
        self.gates
            .get(key)
            .map(|gate| gate.time_remaining())
            .unwrap_or(Duration::ZERO)
    }

    /// Forgets the last action for `key`.
    pub fn reset(&self, key: &str) {
        self.gates.remove(key);
    }

    /// Forgets every key.
    pub fn clear(&self) {
        self.gates.clear();
    }

    /// Drops gates whose cooldown has fully elapsed.
    ///
    /// Returns how many were dropped. Behaviour is unchanged: a missing gate
    /// permits the next action just like an expired one.
    pub fn prune(&self) -> usize {
        let before = self.gates.len();
        self.gates.retain(|_, gate| !gate.time_remaining().is_zero());
        before - self.gates.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// True if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// The shared cooldown.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl std::fmt::Debug for KeyedRefreshGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRefreshGate")
            .field("keys", &self.gates.len())
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltmart_core::ManualClock;

    const DAY: u64 = 24 * 60 * 60;

    fn keyed() -> (KeyedRefreshGate, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let gate = KeyedRefreshGate::with_clock(Duration::from_secs(30 * DAY), clock.clone());
        (gate, clock)
    }

    #[test]
    fn test_keys_are_independent() {
        let (gate, _) = keyed();
        assert!(gate.try_acquire("listing-a"));
        assert!(!gate.try_acquire("listing-a"));
        assert!(gate.try_acquire("listing-b"));
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn test_time_remaining_per_key() {
        let (gate, clock) = keyed();
        assert_eq!(gate.time_remaining("listing-a"), Duration::ZERO);

        gate.try_acquire("listing-a");
        clock.advance(Duration::from_secs(10 * DAY));
        assert_eq!(gate.time_remaining("listing-a"), Duration::from_secs(20 * DAY));
        assert_eq!(gate.time_remaining("listing-b"), Duration::ZERO);
    }

    #[test]
    fn test_acquire_or_throttled() {
        let (gate, _) = keyed();
        assert!(gate.acquire_or_throttled("x").is_ok());
        assert!(gate.acquire_or_throttled("x").unwrap_err().is_throttled());
    }

    #[test]
    fn test_prune_drops_expired() {
        let (gate, clock) = keyed();
        gate.try_acquire("old");
        clock.advance(Duration::from_secs(31 * DAY));
        gate.try_acquire("fresh");

        assert_eq!(gate.prune(), 1);
        assert_eq!(gate.len(), 1);
        assert!(!gate.try_acquire("fresh"));
        assert!(gate.try_acquire("old"));
    }

    #[test]
    fn test_reset_and_clear() {
        let (gate, _) = keyed();
        gate.try_acquire("a");
        gate.try_acquire("b");

        gate.reset("a");
        assert!(gate.try_acquire("a"));

        gate.clear();
        assert!(gate.is_empty());
        assert!(gate.try_acquire("b"));
    }
}
