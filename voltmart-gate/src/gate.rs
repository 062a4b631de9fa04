//! Single-window cooldown gate.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use voltmart_core::clock::{elapsed_between, Clock, SystemClock};
use voltmart_core::error::{Result, SyncError};

/// Snapshot of a gate's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    /// When the last permitted action happened
    pub last_action_at: Option<DateTime<Utc>>,
    /// Minimum time between permitted actions
    pub cooldown: Duration,
}

impl CooldownState {
    /// Time left before the next action is permitted at `now`.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        match self.last_action_at {
            None => Duration::ZERO,
            Some(last) => self.cooldown.saturating_sub(elapsed_between(last, now)),
        }
    }

    /// True if an action at `now` would be permitted.
    pub fn permits_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_at(now).is_zero()
    }
}

/// Gate state plus a counter bumped by every acquire and reset, so a
/// permit only rolls back its own record.
#[derive(Debug)]
struct Slot {
    state: CooldownState,
    acquisitions: u64,
}

/// Enforces a minimum interval between permitted actions.
///
/// The first call is always permitted. Check-and-record happens under one
/// lock, so two racing callers cannot both be admitted.
pub struct RefreshGate {
    slot: Mutex<Slot>,
    clock: Arc<dyn Clock>,
}

impl RefreshGate {
    /// Creates a gate backed by the system clock.
    pub fn new(cooldown: Duration) -> Self {
        Self::with_clock(cooldown, Arc::new(SystemClock))
    }

    /// Creates a gate reading time from `clock`.
    pub fn with_clock(cooldown: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: CooldownState {
                    last_action_at: None,
                    cooldown,
                },
                acquisitions: 0,
            }),
            clock,
        }
    }

    /// Records an action and returns `true` if the cooldown has elapsed;
    /// otherwise returns `false` and leaves the state untouched.
    pub fn try_acquire(&self) -> bool {
        self.check_and_record().is_ok()
    }

    /// Like [`try_acquire`](Self::try_acquire), but reports a denial as
    /// [`SyncError::Throttled`] for `?`-style callers.
    pub fn acquire_or_throttled(&self) -> Result<()> {
        self.check_and_record()
            .map(|_| ())
            .map_err(|remaining| SyncError::Throttled { remaining })
    }

    /// Records an action and returns a permit that undoes the record when
    /// dropped without [`CooldownPermit::commit`].
    ///
    /// For actions that may fail after the gate admits them: a failed
    /// action releases the cooldown so an immediate retry is admitted.
    pub fn acquire_permit(&self) -> Result<CooldownPermit<'_>> {
        let (previous, acquisition) = self
            .check_and_record()
            .map_err(|remaining| SyncError::Throttled { remaining })?;
        Ok(CooldownPermit {
            gate: self,
            previous,
            acquisition,
            committed: false,
        })
    }

    /// Time left before the next action is permitted; zero if permitted now.
    pub fn time_remaining(&self) -> Duration {
        self.slot.lock().state.remaining_at(self.clock.now())
    }

    /// When the last permitted action happened.
    pub fn last_action_at(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().state.last_action_at
    }

    /// The configured cooldown.
    pub fn cooldown(&self) -> Duration {
        self.slot.lock().state.cooldown
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> CooldownState {
        self.slot.lock().state
    }

    /// Forgets the last action, e.g. on sign-out.
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        slot.state.last_action_at = None;
        slot.acquisitions += 1;
    }

    /// Single clock read; on success returns the replaced timestamp and the
    /// acquisition number, on denial the remaining cooldown.
    fn check_and_record(&self) -> std::result::Result<(Option<DateTime<Utc>>, u64), Duration> {
        let now = self.clock.now();
        let mut slot = self.slot.lock();
        let remaining = slot.state.remaining_at(now);
        if !remaining.is_zero() {
            debug!(remaining_ms = remaining.as_millis() as u64, "Action throttled");
            return Err(remaining);
        }
        let previous = slot.state.last_action_at.replace(now);
        slot.acquisitions += 1;
        Ok((previous, slot.acquisitions))
    }
}

/// An admitted action whose cooldown is released on drop unless committed.
#[must_use = "dropping the permit immediately releases the cooldown"]
pub struct CooldownPermit<'a> {
    gate: &'a RefreshGate,
    previous: Option<DateTime<Utc>>,
    acquisition: u64,
    committed: bool,
}

impl CooldownPermit<'_> {
    /// Keeps the recorded action; the cooldown runs from it.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for CooldownPermit<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut slot = self.gate.slot.lock();
        // A later acquire or reset owns the state now.
        if slot.acquisitions != self.acquisition {
            return;
        }
        slot.state.last_action_at = self.previous;
        slot.acquisitions += 1;
        debug!("Released cooldown of an action that did not complete");
    }
}

impl std::fmt::Debug for RefreshGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGate")
            .field("state", &self.slot.lock().state)
            .finish()
    }
}
