//! # Voltmart Gate
//!
//! Cooldown enforcement for repeatable, cost-bearing user actions.
//!
//! - [`RefreshGate`]: one cooldown window, e.g. pull-to-refresh on a feed
//! - [`KeyedRefreshGate`]: an independent window per entity, e.g. bumping
//!   each listing at most once every 30 days
//!
//! A denied action is a normal outcome, not a failure. [`RefreshGate::try_acquire`]
//! returns `false` and the caller renders [`RefreshGate::time_remaining`].
//! Actions that can fail after admission take a [`CooldownPermit`] instead,
//! which hands the window back unless committed.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use voltmart_core::ManualClock;
//! use voltmart_gate::RefreshGate;
//!
//! let clock = Arc::new(ManualClock::at_epoch());
//! let gate = RefreshGate::with_clock(Duration::from_secs(10), clock.clone());
//!
//! assert!(gate.try_acquire());
//! clock.advance(Duration::from_secs(5));
//! assert!(!gate.try_acquire());
//! assert_eq!(gate.time_remaining(), Duration::from_secs(5));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod gate;
mod keyed;

pub use gate::{CooldownPermit, CooldownState, RefreshGate};
pub use keyed::KeyedRefreshGate;
