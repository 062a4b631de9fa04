//! # Voltmart Query
//!
//! Coalesces bursts of user input (a map camera settling after a drag, a
//! search box being typed into) into a single remote query fired after a
//! quiet period.
//!
//! - [`DebouncedQuery::trigger`] restarts the quiet period with new params;
//!   only the last params of a burst are ever sent
//! - [`DebouncedQuery::cancel`] drops a pending invocation without firing it
//! - A response is applied only while its trigger is still the latest one;
//!   slower answers to older triggers are discarded
//!
//! Results are published as [`QuerySnapshot`]s on a watch channel.
//!
//! ## Example
//!
//! ```rust,ignore
//! use voltmart_query::DebouncedQuery;
//!
//! let source = source.clone();
//! let query = DebouncedQuery::new(Duration::from_millis(750), move |region: MapRegion| {
//!     let source = source.clone();
//!     async move { source.fetch_in_region(region, 50).await }
//! });
//!
//! let mut results = query.subscribe();
//! query.trigger(region);
//! results.changed().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod debounce;
mod query;

pub use debounce::{DebouncedQuery, QuerySnapshot, QueryStats};
pub use query::Query;
