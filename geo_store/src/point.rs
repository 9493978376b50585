use std::fmt;

use crate::errors::GeoStoreError;

/// A geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Creates a new point, validating that latitude is in `[-90, 90]` and
    /// longitude in `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoStoreError> {
        if !Self::is_valid(latitude, longitude) {
            return Err(GeoStoreError::InvalidCoordinate(latitude, longitude));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn is_valid(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_full_valid_range() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_non_finite_values() {
        assert_eq!(
            GeoPoint::new(90.5, 0.0),
            Err(GeoStoreError::InvalidCoordinate(90.5, 0.0))
        );
        assert!(GeoPoint::new(0.0, -180.1).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }
}
