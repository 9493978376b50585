use std::collections::{BTreeSet, HashMap};

use crate::distance::distance_m;
use crate::errors::GeoStoreError;
use crate::geohash::{self, DEFAULT_PRECISION};
use crate::point::GeoPoint;

/// Longest key accepted, so that keys fit a length-prefixed wire string.
pub const MAX_KEY_LENGTH: usize = u16::MAX as usize;

#[derive(Debug, Clone)]
struct StoredLocation {
    point: GeoPoint,
    geohash: String,
}

/// A key/value store mapping keys to one location each, indexed by geohash.
///
/// Writing a key that already exists replaces its location; no history is kept.
#[derive(Debug, Clone)]
pub struct GeoStore {
    entries: HashMap<String, StoredLocation>,
    index: BTreeSet<(String, String)>,
}

impl Default for GeoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            index: BTreeSet::new(),
        }
    }

    /// Sets the location of `key`, replacing any previous one.
    ///
    /// # Returns
    /// The previous location of the key, if it had one.
    ///
    /// # Errors
    /// - `GeoStoreError::InvalidKey` if the key is empty, too long or has control characters.
    pub fn set_location(
        &mut self,
        key: &str,
        point: GeoPoint,
    ) -> Result<Option<GeoPoint>, GeoStoreError> {
        validate_key(key)?;
        let geohash = geohash::encode(&point, DEFAULT_PRECISION)?;

        let previous = self.remove_location(key);
        self.index.insert((geohash.clone(), key.to_string()));
        self.entries
            .insert(key.to_string(), StoredLocation { point, geohash });

        Ok(previous)
    }

    pub fn get_location(&self, key: &str) -> Option<GeoPoint> {
        self.entries.get(key).map(|stored| stored.point)
    }

    pub fn geohash_of(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|stored| stored.geohash.as_str())
    }

    /// Removes `key` and returns its last location.
    pub fn remove_location(&mut self, key: &str) -> Option<GeoPoint> {
        let stored = self.entries.remove(key)?;
        self.index.remove(&(stored.geohash, key.to_string()));
        Some(stored.point)
    }

    /// Returns every key whose location lies within `radius_km` of `center`,
    /// measured along the great circle. Points exactly on the boundary are included.
    pub fn keys_in_radius(
        &self,
        center: &GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<(String, GeoPoint)>, GeoStoreError> {
        validate_radius(radius_km)?;
        let radius_m = radius_km * 1000.0;

        let mut found = Vec::new();
        for prefix in geohash::query_prefixes(center, radius_m, DEFAULT_PRECISION) {
            let candidates = self
                .index
                .range((prefix.clone(), String::new())..)
                .take_while(|(hash, _)| hash.starts_with(&prefix));

            for (_, key) in candidates {
                if let Some(stored) = self.entries.get(key) {
                    if distance_m(center, &stored.point) <= radius_m {
                        found.push((key.clone(), stored.point));
                    }
                }
            }
        }

        // Prefixes never overlap, but sort for a stable order.
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found.dedup_by(|a, b| a.0 == b.0);

        Ok(found)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeoPoint)> {
        self.entries
            .iter()
            .map(|(key, stored)| (key.as_str(), &stored.point))
    }
}

pub fn validate_key(key: &str) -> Result<(), GeoStoreError> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH || key.chars().any(char::is_control) {
        return Err(GeoStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub fn validate_radius(radius_km: f64) -> Result<(), GeoStoreError> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(GeoStoreError::InvalidRadius(radius_km));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{longitude_extent_degrees, meters_to_latitude_degrees};

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn north_of(center: &GeoPoint, meters: f64) -> GeoPoint {
        point(
            center.latitude() + meters_to_latitude_degrees(meters),
            center.longitude(),
        )
    }

    #[test]
    fn set_and_get_location() {
        let mut store = GeoStore::new();
        let p = point(-34.6037, -58.3816);

        assert_eq!(store.set_location("25", p).unwrap(), None);
        assert_eq!(store.get_location("25"), Some(p));
        assert_eq!(store.len(), 1);
        assert_eq!(store.geohash_of("25").map(str::len), Some(DEFAULT_PRECISION));
    }

    #[test]
    fn last_write_wins() {
        let mut store = GeoStore::new();
        let first = point(-34.6037, -58.3816);
        let second = point(40.7128, -74.0060);

        store.set_location("25", first).unwrap();
        assert_eq!(store.set_location("25", second).unwrap(), Some(first));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_location("25"), Some(second));
        assert!(store.keys_in_radius(&first, 2.5).unwrap().is_empty());
        assert_eq!(
            store.keys_in_radius(&second, 2.5).unwrap(),
            vec![("25".to_string(), second)]
        );
    }

    #[test]
    fn remove_location_clears_the_index() {
        let mut store = GeoStore::new();
        let p = point(10.0, 10.0);
        store.set_location("1", p).unwrap();

        assert_eq!(store.remove_location("1"), Some(p));
        assert_eq!(store.remove_location("1"), None);
        assert!(store.is_empty());
        assert!(store.keys_in_radius(&p, 1.0).unwrap().is_empty());
    }

    #[test]
    fn radius_query_is_exact_at_the_boundary() {
        let mut store = GeoStore::new();
        let center = point(-34.6037, -58.3816);

        store.set_location("inside", north_of(&center, 2400.0)).unwrap();
        store.set_location("outside", north_of(&center, 2600.0)).unwrap();
        store.set_location("center", center).unwrap();
        store.set_location("far", point(0.0, 0.0)).unwrap();

        let keys: Vec<String> = store
            .keys_in_radius(&center, 2.5)
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        assert_eq!(keys, vec!["center".to_string(), "inside".to_string()]);
    }

    #[test]
    fn radius_query_across_the_antimeridian() {
        let mut store = GeoStore::new();
        store.set_location("east", point(0.0, 179.99)).unwrap();
        store.set_location("west", point(0.0, -179.99)).unwrap();

        let found = store.keys_in_radius(&point(0.0, 180.0), 5.0).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn zero_radius_only_matches_the_exact_point() {
        let mut store = GeoStore::new();
        let center = point(1.0, 1.0);
        store.set_location("here", center).unwrap();
        store.set_location("near", north_of(&center, 5.0)).unwrap();

        let found = store.keys_in_radius(&center, 0.0).unwrap();
        assert_eq!(found, vec![("here".to_string(), center)]);
    }

    #[test]
    fn rejects_invalid_keys_and_radii() {
        let mut store = GeoStore::new();
        let p = point(0.0, 0.0);

        assert!(matches!(
            store.set_location("", p),
            Err(GeoStoreError::InvalidKey(_))
        ));
        assert!(store.set_location("a\nb", p).is_err());
        assert_eq!(
            store.keys_in_radius(&p, -1.0),
            Err(GeoStoreError::InvalidRadius(-1.0))
        );
        assert!(store.keys_in_radius(&p, f64::NAN).is_err());
    }

    #[test]
    fn radius_query_reaches_into_the_next_cell() {
        let mut store = GeoStore::new();
        // Longitude 0.3515625 separates two 4-character cells.
        let boundary = 0.3515625;
        let reach = longitude_extent_degrees(2499.0, 0.0001);
        let center = point(0.0001, boundary - reach + 2e-6);
        let across = point(0.0001, center.longitude() + reach);
        store.set_location("across", across).unwrap();

        assert_ne!(
            geohash::encode(&center, 4).unwrap(),
            geohash::encode(&across, 4).unwrap()
        );
        assert_eq!(
            store.keys_in_radius(&center, 2.5).unwrap(),
            vec![("across".to_string(), across)]
        );
    }
}
