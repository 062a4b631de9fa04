//! # Voltmart Core
//!
//! Core types, errors, and traits for the Voltmart client-side sync layer.
//!
//! This crate provides the foundational building blocks used by all other Voltmart crates:
//!
//! - **Types**: Domain snapshots for listings, profiles, chart aggregates, and map regions
//! - **Errors**: One error enum classified into network, decoding, and throttling failures
//! - **Traits**: The [`RemoteDataSource`] boundary and the [`Clock`] used for cooldowns
//! - **Config**: Page sizes, cooldowns, and debounce delays with env overrides
//!
//! ## Example
//!
//! ```rust
//! use voltmart_core::{CacheKey, Listing, SyncConfig};
//!
//! let key = CacheKey::parse("Profile:123").unwrap();
//! assert_eq!(key.kind(), "Profile");
//!
//! let config = SyncConfig::default();
//! assert_eq!(config.page_size, 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SyncConfig;
pub use constants::*;
pub use error::{ErrorKind, Result, SyncError};
pub use traits::*;
pub use types::*;
