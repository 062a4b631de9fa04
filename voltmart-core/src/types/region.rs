//! Map viewport regions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// A geographic point in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude, -90..=90
    pub lat: f64,
    /// Longitude, -180..=180
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// The bounding box currently visible on the map.
///
/// Regions that cross the antimeridian are not supported; `west` must be
/// less than or equal to `east`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    /// Southern latitude bound
    pub south: f64,
    /// Western longitude bound
    pub west: f64,
    /// Northern latitude bound
    pub north: f64,
    /// Eastern longitude bound
    pub east: f64,
}

impl MapRegion {
    /// Creates a region, validating the bounds.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self> {
        let region = Self {
            south,
            west,
            north,
            east,
        };
        region.validate()?;
        Ok(region)
    }

    /// Creates a region centred on `center` spanning the given deltas.
    pub fn around(center: GeoPoint, lat_delta: f64, lon_delta: f64) -> Result<Self> {
        Self::new(
            center.lat - lat_delta / 2.0,
            center.lon - lon_delta / 2.0,
            center.lat + lat_delta / 2.0,
            center.lon + lon_delta / 2.0,
        )
    }

    /// Validates the bounds.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(SyncError::InvalidPayload("region bounds must be finite".into()));
        }
        if self.south < -90.0 || self.north > 90.0 || self.south > self.north {
            return Err(SyncError::InvalidPayload(format!(
                "invalid latitude bounds {}..{}",
                self.south, self.north
            )));
        }
        if self.west < -180.0 || self.east > 180.0 || self.west > self.east {
            return Err(SyncError::InvalidPayload(format!(
                "invalid longitude bounds {}..{}",
                self.west, self.east
            )));
        }
        Ok(())
    }

    /// Returns true if the point lies inside the region (bounds inclusive).
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lon >= self.west
            && point.lon <= self.east
    }

    /// Returns the centre of the region.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    /// Returns a copy moved by the given deltas, as a map drag would.
    pub fn panned(&self, d_lat: f64, d_lon: f64) -> Self {
        Self {
            south: self.south + d_lat,
            west: self.west + d_lon,
            north: self.north + d_lat,
            east: self.east + d_lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_inclusive_bounds() {
        let region = MapRegion::new(52.0, 13.0, 53.0, 14.0).unwrap();
        assert!(region.contains(GeoPoint::new(52.5, 13.4)));
        assert!(region.contains(GeoPoint::new(52.0, 13.0)));
        assert!(!region.contains(GeoPoint::new(51.9, 13.4)));
    }

    #[test]
    fn test_around_centres_region() {
        let region = MapRegion::around(GeoPoint::new(48.0, 11.0), 1.0, 2.0).unwrap();
        assert_eq!(region.center(), GeoPoint::new(48.0, 11.0));
        assert_eq!(region.west, 10.0);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(MapRegion::new(53.0, 13.0, 52.0, 14.0).is_err());
        assert!(MapRegion::new(52.0, 14.0, 53.0, 13.0).is_err());
        assert!(MapRegion::new(f64::NAN, 13.0, 53.0, 14.0).is_err());
    }

    #[test]
    fn test_panned_moves_all_bounds() {
        let region = MapRegion::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let moved = region.panned(0.5, -0.5);
        assert_eq!(moved.south, 0.5);
        assert_eq!(moved.east, 0.5);
    }
}
