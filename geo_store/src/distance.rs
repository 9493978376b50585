use crate::point::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;
/// Length of one degree of a great circle on the sphere used by [`distance_m`].
pub const METERS_PER_DEGREE: f64 = EARTH_MEAN_RADIUS_M * std::f64::consts::PI / 180.0;

/// Great-circle distance between two points, in meters, using the haversine formula.
pub fn distance_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).to_radians();
    let delta_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_MEAN_RADIUS_M * c
}

pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    distance_m(a, b) / 1000.0
}

/// Degrees of latitude spanned by `distance` meters.
pub fn meters_to_latitude_degrees(distance: f64) -> f64 {
    distance / METERS_PER_DEGREE
}

/// Largest longitude offset, in degrees, of any point within `radius_m` meters
/// of a center at `center_latitude`.
///
/// A circle that reaches a pole spans the whole parallel, so the result
/// saturates at 360 degrees.
pub fn longitude_extent_degrees(radius_m: f64, center_latitude: f64) -> f64 {
    let angular = radius_m / EARTH_MEAN_RADIUS_M;
    if angular >= std::f64::consts::FRAC_PI_2 {
        return 360.0;
    }

    let ratio = angular.sin() / center_latitude.to_radians().cos();
    if !ratio.is_finite() || ratio >= 1.0 {
        return 360.0;
    }

    ratio.asin().to_degrees()
}

/// Wraps a longitude into `[-180, 180)`.
pub fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.is_finite() {
        wrapped
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn distance_to_itself_is_zero() {
        let p = point(-34.6037, -58.3816);
        assert_eq!(distance_m(&p, &p), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance_km(&point(0.0, 0.0), &point(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn known_city_distance() {
        // Buenos Aires to Montevideo, roughly 205 km.
        let d = distance_km(&point(-34.6037, -58.3816), &point(-34.9011, -56.1645));
        assert!((d - 205.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn distance_is_symmetric_across_the_antimeridian() {
        let a = point(10.0, 179.9);
        let b = point(10.0, -179.9);
        let d = distance_km(&a, &b);
        assert!(d < 25.0, "got {}", d);
        assert!((distance_m(&a, &b) - distance_m(&b, &a)).abs() < 1e-6);
    }

    #[test]
    fn latitude_degrees_match_the_haversine_sphere() {
        let delta = meters_to_latitude_degrees(2500.0);
        let d = distance_m(&point(10.0, 20.0), &point(10.0 + delta, 20.0));
        assert!((d - 2500.0).abs() < 1e-6, "got {}", d);
    }

    #[test]
    fn longitude_extent_grows_towards_the_poles() {
        let equator = longitude_extent_degrees(1000.0, 0.0);
        let north = longitude_extent_degrees(1000.0, 60.0);
        assert!(north > equator);
        assert_eq!(longitude_extent_degrees(1000.0, 90.0), 360.0);
        assert_eq!(longitude_extent_degrees(0.0, 45.0), 0.0);
    }

    #[test]
    fn widest_point_of_the_circle_lies_on_its_edge() {
        let latitude: f64 = 60.0;
        let radius = 2500.0;
        let angular = radius / EARTH_MEAN_RADIUS_M;
        let widest_latitude = (latitude.to_radians().sin() / angular.cos()).asin().to_degrees();

        let center = point(latitude, 10.0);
        let widest = point(widest_latitude, 10.0 + longitude_extent_degrees(radius, latitude));
        let d = distance_m(&center, &widest);
        assert!((d - radius).abs() < 1e-3, "got {}", d);
    }

    #[test]
    fn wraps_longitudes() {
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(190.0), -170.0);
        assert_eq!(wrap_longitude(-190.0), 170.0);
        assert_eq!(wrap_longitude(45.0), 45.0);
    }
}
