//! # Voltmart Remote
//!
//! In-memory stand-in for the marketplace backend.
//!
//! [`MemoryDataSource`] implements [`RemoteDataSource`] over ordered
//! collections and keyed entities, with knobs for latency and injected
//! failures so sync components can be exercised without a network.
//!
//! ## Example
//!
//! ```rust,ignore
//! use voltmart_remote::{fixtures, MemoryDataSource};
//!
//! let source = MemoryDataSource::new();
//! fixtures::seed_marketplace(&source, 33)?;
//!
//! let page = source.fetch_range("listings", 0, 9).await?;
//! assert_eq!(page.len(), 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod fixtures;
mod memory;

pub use memory::{MemoryDataSource, RangeRequest};

// Re-export the trait from core
pub use voltmart_core::traits::RemoteDataSource;
