use std::collections::BTreeSet;

use ::geohash::{decode_bbox, neighbor, Direction};
use geo_types::Coord;

use crate::distance::{longitude_extent_degrees, meters_to_latitude_degrees, wrap_longitude};
use crate::errors::GeoStoreError;
use crate::point::GeoPoint;

/// Precision used for stored locations (about 1.2 m × 0.6 m cells).
pub const DEFAULT_PRECISION: usize = 10;
pub const MAX_PRECISION: usize = 12;

/// Relative slack added to the circle's bounding box before choosing cells.
const BOX_MARGIN: f64 = 1e-9;

/// Each neighbouring cell with its `(north, east)` offset in cells.
const NEIGHBORS: [(Direction, f64, f64); 8] = [
    (Direction::N, 1.0, 0.0),
    (Direction::NE, 1.0, 1.0),
    (Direction::E, 0.0, 1.0),
    (Direction::SE, -1.0, 1.0),
    (Direction::S, -1.0, 0.0),
    (Direction::SW, -1.0, -1.0),
    (Direction::W, 0.0, -1.0),
    (Direction::NW, 1.0, -1.0),
];

/// Encodes a point as a base-32 geohash of `precision` characters.
pub fn encode(point: &GeoPoint, precision: usize) -> Result<String, GeoStoreError> {
    if precision == 0 || precision > MAX_PRECISION {
        return Err(GeoStoreError::InvalidPrecision(precision));
    }

    ::geohash::encode(coord(point), precision)
        .map_err(|_| GeoStoreError::InvalidCoordinate(point.latitude(), point.longitude()))
}

fn coord(point: &GeoPoint) -> Coord<f64> {
    Coord {
        x: point.longitude(),
        y: point.latitude(),
    }
}

/// `(latitude, longitude)` size in degrees of the cell `hash`.
fn cell_size(hash: &str) -> Option<(f64, f64)> {
    let bbox = decode_bbox(hash).ok()?;
    Some((bbox.height(), bbox.width()))
}

/// Computes the geohash prefixes whose union covers the circle of `radius_m`
/// meters around `center`, using prefixes of at most `max_precision` characters.
///
/// The center cell is the finest one at least as large as the circle's
/// bounding box in both axes, so the box never reaches past the ring of its
/// eight neighbours. An empty prefix means the whole world.
pub fn query_prefixes(center: &GeoPoint, radius_m: f64, max_precision: usize) -> BTreeSet<String> {
    let latitude_span = 2.0 * meters_to_latitude_degrees(radius_m) * (1.0 + BOX_MARGIN);
    let longitude_span =
        2.0 * longitude_extent_degrees(radius_m, center.latitude()) * (1.0 + BOX_MARGIN);

    let mut center_cell = None;
    for precision in 1..=max_precision.min(MAX_PRECISION) {
        let Ok(hash) = encode(center, precision) else {
            break;
        };
        match cell_size(&hash) {
            Some((height, width)) if height >= latitude_span && width >= longitude_span => {
                center_cell = Some(hash);
            }
            _ => break,
        }
    }

    let mut prefixes = BTreeSet::new();
    let Some(center_cell) = center_cell else {
        prefixes.insert(String::new());
        return prefixes;
    };

    for (direction, north, east) in NEIGHBORS {
        let cell = neighbor(&center_cell, direction)
            .ok()
            .or_else(|| wrapped_neighbor(&center_cell, north, east));
        if let Some(cell) = cell {
            prefixes.insert(cell);
        }
    }
    prefixes.insert(center_cell);

    prefixes
}

/// Neighbour across the antimeridian. Cells past a pole do not exist.
fn wrapped_neighbor(hash: &str, north: f64, east: f64) -> Option<String> {
    let bbox = decode_bbox(hash).ok()?;
    let cell_center = bbox.center();
    let latitude = cell_center.y + north * bbox.height();
    let longitude = wrap_longitude(cell_center.x + east * bbox.width());

    let point = GeoPoint::new(latitude, longitude).ok()?;
    encode(&point, hash.len()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::distance_m;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn covered(prefixes: &BTreeSet<String>, p: &GeoPoint) -> bool {
        let hash = encode(p, DEFAULT_PRECISION).unwrap();
        prefixes.iter().any(|prefix| hash.starts_with(prefix.as_str()))
    }

    #[test]
    fn encodes_known_values() {
        assert_eq!(encode(&point(42.605, -5.603), 5).unwrap(), "ezs42");
        assert_eq!(encode(&point(57.64911, 10.40744), 11).unwrap(), "u4pruydqqvj");
        assert_eq!(encode(&point(-90.0, -180.0), 3).unwrap(), "000");
        assert_eq!(encode(&point(90.0, 180.0), 3).unwrap(), "zzz");
    }

    #[test]
    fn longer_hashes_extend_shorter_ones() {
        let p = point(-34.6037, -58.3816);
        let short = encode(&p, 4).unwrap();
        let long = encode(&p, DEFAULT_PRECISION).unwrap();
        assert!(long.starts_with(&short));
    }

    #[test]
    fn rejects_unsupported_precisions() {
        let p = point(0.0, 0.0);
        assert_eq!(encode(&p, 0), Err(GeoStoreError::InvalidPrecision(0)));
        assert!(encode(&p, MAX_PRECISION + 1).is_err());
    }

    #[test]
    fn small_radius_uses_a_ring_of_fine_cells() {
        let prefixes = query_prefixes(&point(-34.6037, -58.3816), 2500.0, DEFAULT_PRECISION);
        assert_eq!(prefixes.len(), 9);
        assert!(prefixes.iter().all(|prefix| prefix.len() == 4));
    }

    #[test]
    fn prefixes_cover_points_on_the_circle() {
        let center = point(-34.6037, -58.3816);
        let prefixes = query_prefixes(&center, 2500.0, DEFAULT_PRECISION);
        let delta = meters_to_latitude_degrees(2499.0);
        let east = longitude_extent_degrees(2499.0, center.latitude());

        for candidate in [
            point(center.latitude() + delta, center.longitude()),
            point(center.latitude() - delta, center.longitude()),
            point(center.latitude(), center.longitude() + east),
            point(center.latitude(), center.longitude() - east),
        ] {
            assert!(covered(&prefixes, &candidate));
        }
    }

    #[test]
    fn circle_edge_just_past_a_cell_boundary_is_covered() {
        // 0.3515625 is a boundary between precision 4 cells.
        let boundary = 0.3515625;
        let reach = longitude_extent_degrees(2499.0, 0.0001);
        let center = point(0.0001, boundary - reach + 2e-6);
        let sighting = point(0.0001, center.longitude() + reach);

        assert!(sighting.longitude() > boundary);
        assert!(distance_m(&center, &sighting) <= 2500.0);

        let prefixes = query_prefixes(&center, 2500.0, DEFAULT_PRECISION);
        assert!(covered(&prefixes, &sighting));
    }

    #[test]
    fn ring_wraps_around_the_antimeridian() {
        let prefixes = query_prefixes(&point(0.0, 179.99), 2500.0, DEFAULT_PRECISION);

        assert_eq!(prefixes.len(), 9);
        assert!(covered(&prefixes, &point(0.0, -179.999)));
    }

    #[test]
    fn cells_past_the_pole_are_skipped() {
        let prefixes = query_prefixes(&point(89.9999, 0.0), 1.0, DEFAULT_PRECISION);

        assert!(!prefixes.is_empty() && prefixes.len() < 9);
        assert!(covered(&prefixes, &point(89.9999, 0.0)));
    }

    #[test]
    fn zero_radius_is_capped_at_the_requested_precision() {
        let prefixes = query_prefixes(&point(1.0, 1.0), 0.0, 6);
        assert!(prefixes.iter().all(|prefix| prefix.len() == 6));
        assert!(covered(&prefixes, &point(1.0, 1.0)));
    }

    #[test]
    fn huge_radius_scans_everything() {
        let prefixes = query_prefixes(&point(0.0, 0.0), 10_000_000.0, DEFAULT_PRECISION);
        assert_eq!(prefixes.into_iter().collect::<Vec<_>>(), vec![String::new()]);
    }
}
