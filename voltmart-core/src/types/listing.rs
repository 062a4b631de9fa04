//! Marketplace listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::region::GeoPoint;
use crate::error::{Result, SyncError};
use crate::traits::Cacheable;

/// A vehicle offered for sale.
///
/// Feeds order listings newest first by `promoted_at`, falling back to
/// `created_at` for listings that were never bumped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Backend-assigned identifier
    pub id: Uuid,
    /// Seller profile id
    pub seller_id: Uuid,
    /// Free-form headline
    pub title: String,
    /// Manufacturer, e.g. "Tesla"
    pub make: String,
    /// Model name, e.g. "Model 3"
    pub model: String,
    /// Model year
    pub year: u16,
    /// Asking price in cents
    pub price_cents: u64,
    /// Rated range in kilometres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_km: Option<u32>,
    /// Usable battery capacity in kWh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_kwh: Option<f32>,
    /// Where the vehicle can be viewed
    pub location: GeoPoint,
    /// When the listing was created
    pub created_at: DateTime<Utc>,
    /// When the listing was last bumped to the top, if ever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<DateTime<Utc>>,
}

impl Listing {
    /// Timestamp used to order the feed.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.promoted_at.unwrap_or(self.created_at)
    }

    /// Validates fields the backend is expected to enforce.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(SyncError::InvalidPayload(format!(
                "listing {} has an empty title",
                self.id
            )));
        }
        if self.year < 1990 {
            return Err(SyncError::InvalidPayload(format!(
                "listing {} has implausible year {}",
                self.id, self.year
            )));
        }
        Ok(())
    }
}

impl Cacheable for Listing {
    const KIND: &'static str = "Listing";

    fn cache_id(&self) -> String {
        self.id.to_string()
    }
}
