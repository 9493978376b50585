use std::fmt::{self, Display};

/// Enum representing the possible errors that can occur within the geo store.
///
/// - `InvalidCoordinate`: latitude or longitude out of range, or not finite.
/// - `InvalidKey`: the key is empty, too long or contains control characters.
/// - `InvalidRadius`: the radius is negative or not finite.
/// - `InvalidPrecision`: the geohash precision is outside the supported range.
/// - `UnknownQuery`: no live query is registered under the given id.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoStoreError {
    InvalidCoordinate(f64, f64),
    InvalidKey(String),
    InvalidRadius(f64),
    InvalidPrecision(usize),
    UnknownQuery(String),
}

impl Display for GeoStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoStoreError::InvalidCoordinate(lat, lon) => write!(
                f,
                "[InvalidCoordinate]: ({}, {}) is not a valid latitude/longitude pair",
                lat, lon
            ),
            GeoStoreError::InvalidKey(key) => {
                write!(f, "[InvalidKey]: {:?} cannot be used as a key", key)
            }
            GeoStoreError::InvalidRadius(radius) => {
                write!(f, "[InvalidRadius]: {} is not a valid radius", radius)
            }
            GeoStoreError::InvalidPrecision(precision) => write!(
                f,
                "[InvalidPrecision]: geohash precision {} is not supported",
                precision
            ),
            GeoStoreError::UnknownQuery(id) => {
                write!(f, "[UnknownQuery]: no live query with id {}", id)
            }
        }
    }
}

impl std::error::Error for GeoStoreError {}
