//! # Voltmart Feed
//!
//! Presents a remote collection as an append-only, incrementally growing
//! sequence for infinite-scroll screens.
//!
//! ## Features
//!
//! - **Forward paging**: [`PaginatedFeed::load_next_page`] appends the next
//!   `page_size` items and detects exhaustion from a short page
//! - **Refresh**: [`PaginatedFeed::refresh`] replaces the list with the first
//!   page, rate-limited by a cooldown gate
//! - **Stale-result guard**: a page that lands after a refresh started is
//!   discarded instead of appended to the new list
//! - **Subscriptions**: every mutation publishes an immutable [`FeedState`]
//!   snapshot on a watch channel
//!
//! ## Example
//!
//! ```rust,ignore
//! use voltmart_feed::{FeedConfig, LoadOutcome, PaginatedFeed};
//!
//! let feed: PaginatedFeed<Listing, _> = PaginatedFeed::new(source, FeedConfig::listings());
//!
//! while let LoadOutcome::Loaded { .. } = feed.load_next_page().await? {}
//! println!("{} listings", feed.state().items.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod feed;
mod state;

pub use feed::PaginatedFeed;
pub use state::{FeedConfig, FeedState, LoadOutcome, RefreshOutcome};
