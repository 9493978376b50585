use geo_store::GeoPoint;

use crate::pokemon::Sighting;

/// Name given to the destination handed to the maps application.
pub const SIGHTING_PLACE_NAME: &str = "Pokemon Sighting";

/// Side of the square region, in meters, the maps application opens on.
pub const DIRECTIONS_SPAN_M: f64 = 1000.0;

const MAPS_BASE_URL: &str = "https://maps.apple.com/";

/// `dirflg` value asking the maps application for driving directions.
const DRIVING_FLAG: &str = "d";

/// Directions to hand off to the platform's maps application.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    pub destination: GeoPoint,
    pub name: String,
    /// Center of the region the maps application shows.
    pub region_center: GeoPoint,
    /// Size of that region, in meters, along both axes.
    pub region_span_m: f64,
}

impl DirectionsRequest {
    /// Driving directions to a sighting.
    pub fn to_sighting(sighting: &Sighting) -> Self {
        Self {
            destination: sighting.coordinate,
            name: SIGHTING_PLACE_NAME.to_string(),
            region_center: sighting.coordinate,
            region_span_m: DIRECTIONS_SPAN_M,
        }
    }

    /// The request as a maps URL, which desktop platforms open in a browser.
    pub fn maps_url(&self) -> String {
        format!(
            "{}?daddr={},{}&dirflg={}&q={}",
            MAPS_BASE_URL,
            self.destination.latitude(),
            self.destination.longitude(),
            DRIVING_FLAG,
            encode_query_value(&self.name)
        )
    }
}

/// Percent-encodes everything but unreserved characters.
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}
