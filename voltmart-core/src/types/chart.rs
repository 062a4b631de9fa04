//! Price history aggregates for the charts screen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::traits::Cacheable;

/// One point of a price series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Bucket date (weekly buckets start on Monday)
    pub date: NaiveDate,
    /// Median asking price in cents
    pub median_cents: u64,
    /// Listings in the bucket
    pub sample_size: u32,
}

/// Aggregated price history for one make and model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartAggregate {
    /// Manufacturer
    pub make: String,
    /// Model name
    pub model: String,
    /// Points in ascending date order
    pub points: Vec<PricePoint>,
}

impl ChartAggregate {
    /// Latest median price, if any data exists.
    pub fn latest_median(&self) -> Option<u64> {
        self.points.last().map(|p| p.median_cents)
    }

    /// Identifier used for caching and remote lookup, e.g. `tesla/model-3`.
    pub fn slug(make: &str, model: &str) -> String {
        format!(
            "{}/{}",
            make.trim().to_lowercase().replace(' ', "-"),
            model.trim().to_lowercase().replace(' ', "-")
        )
    }
}

impl Cacheable for ChartAggregate {
    const KIND: &'static str = "ChartAggregate";

    fn cache_id(&self) -> String {
        Self::slug(&self.make, &self.model)
    }
}
