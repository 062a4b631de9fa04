//! Domain types for the Voltmart sync layer.
//!
//! These are the snapshots that travel between the backend, the cache, and
//! the view-models:
//!
//! - [`Listing`]: A vehicle offered on the marketplace
//! - [`Profile`]: A seller or buyer profile
//! - [`ChartAggregate`]: Price history series for a make/model
//! - [`MapRegion`]: Visible map bounding box
//! - [`CacheKey`]: Composite `Kind:id` key

mod chart;
mod key;
mod listing;
mod profile;
mod region;

pub use chart::*;
pub use key::*;
pub use listing::*;
pub use profile::*;
pub use region::*;
