//! Deterministic sample data.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use voltmart_core::constants::LISTINGS_COLLECTION;
use voltmart_core::error::Result;
use voltmart_core::types::{ChartAggregate, GeoPoint, Listing, PricePoint, Profile};

use crate::memory::MemoryDataSource;

const MODELS: &[(&str, &str, u32, f32)] = &[
    ("Tesla", "Model 3", 510, 60.0),
    ("Kia", "EV6", 528, 77.4),
    ("Hyundai", "Ioniq 5", 481, 72.6),
    ("Volkswagen", "ID.4", 520, 77.0),
    ("Polestar", "2", 551, 78.0),
    ("Nissan", "Leaf", 270, 39.0),
];

const CITIES: &[GeoPoint] = &[
    GeoPoint { lat: 52.52, lon: 13.40 },
    GeoPoint { lat: 48.14, lon: 11.58 },
    GeoPoint { lat: 53.55, lon: 9.99 },
    GeoPoint { lat: 50.94, lon: 6.96 },
    GeoPoint { lat: 50.11, lon: 8.68 },
];

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default() + Duration::days(19_700)
}

/// Stable id for the seller of sample listing `index`.
pub fn sample_seller_id(index: u64) -> Uuid {
    Uuid::from_u128(0x5e11e7_0000 + u128::from(index % 7))
}

/// Builds the `index`-th sample listing.
///
/// Lower indices are newer, matching the backend's newest-first order.
pub fn sample_listing(index: u64) -> Listing {
    let (make, model, range_km, battery_kwh) = MODELS[(index as usize) % MODELS.len()];
    let city = CITIES[(index as usize) % CITIES.len()];
    // Small per-listing offset so listings in one city don't overlap exactly.
    let jitter = (index % 10) as f64 * 0.01;

    Listing {
        id: Uuid::from_u128(0x1157_0000_0000 + u128::from(index)),
        seller_id: sample_seller_id(index),
        title: format!("{make} {model} #{index}"),
        make: make.into(),
        model: model.into(),
        year: 2018 + (index % 7) as u16,
        price_cents: 2_000_000 + (index % 20) * 75_000,
        range_km: Some(range_km),
        battery_kwh: Some(battery_kwh),
        location: GeoPoint::new(city.lat + jitter, city.lon + jitter),
        created_at: epoch() - Duration::hours(index as i64),
        promoted_at: None,
    }
}

/// Builds the profile for sample seller `index`.
pub fn sample_profile(index: u64) -> Profile {
    Profile {
        id: sample_seller_id(index),
        display_name: format!("seller-{}", index % 7),
        avatar_url: None,
        active_listings: 3,
        joined_at: epoch() - Duration::days(365),
    }
}

/// Builds a weekly price series for a make and model.
pub fn sample_chart(make: &str, model: &str, weeks: u32) -> ChartAggregate {
    let start = epoch().date_naive();
    let points = (0..weeks)
        .map(|w| PricePoint {
            date: start + Duration::weeks(i64::from(w)),
            median_cents: 4_000_000u64.saturating_sub(u64::from(w) * 12_500),
            sample_size: 10 + w,
        })
        .collect();

    ChartAggregate {
        make: make.into(),
        model: model.into(),
        points,
    }
}

/// Fills `source` with `count` listings plus their sellers and a chart per model.
pub fn seed_marketplace(source: &MemoryDataSource, count: u64) -> Result<()> {
    let listings: Vec<Listing> = (0..count).map(sample_listing).collect();
    source.set_collection(LISTINGS_COLLECTION, &listings)?;

    for seller in 0..7 {
        source.put_entity(&sample_profile(seller))?;
    }
    for listing in &listings {
        source.put_entity(listing)?;
    }
    for (make, model, _, _) in MODELS {
        source.put_entity(&sample_chart(make, model, 12))?;
    }
    Ok(())
}
