use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use driver::DEFAULT_NODE_ADDR;
use geo_store::GeoPoint;
use logger::Logger;

use crate::errors::SightingError;
use crate::marker::MarkerPolicy;

/// Where the user is assumed to be when no location is configured.
pub const DEFAULT_LATITUDE: f64 = -34.6037;
pub const DEFAULT_LONGITUDE: f64 = -58.3816;

/// Settings shared by the front-ends.
///
/// | Variable | Meaning |
/// |---|---|
/// | `POKEFINDER_LAT`, `POKEFINDER_LON` | Fixed user location |
/// | `POKEFINDER_LOG_DIR` | Directory for the log file; console only when unset |
/// | `POKEFINDER_MARKERS` | `dedupe` (default) or `accumulate` |
/// | `POKEFINDER_TRACE` | `1`/`true` asks the node to log every request in full |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub location: GeoPoint,
    pub log_dir: Option<PathBuf>,
    pub marker_policy: MarkerPolicy,
    pub node_addr: SocketAddr,
    pub trace: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, SightingError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from the variables `lookup` returns.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, SightingError> {
        let latitude = parse_coordinate(&lookup, "POKEFINDER_LAT", DEFAULT_LATITUDE)?;
        let longitude = parse_coordinate(&lookup, "POKEFINDER_LON", DEFAULT_LONGITUDE)?;
        let location = GeoPoint::new(latitude, longitude)?;

        let marker_policy = match lookup("POKEFINDER_MARKERS") {
            Some(value) => value.parse()?,
            None => MarkerPolicy::default(),
        };

        let node_addr = DEFAULT_NODE_ADDR
            .parse()
            .map_err(|_| SightingError::InvalidConfig(DEFAULT_NODE_ADDR.to_string()))?;

        let trace = match lookup("POKEFINDER_TRACE") {
            Some(value) => parse_switch("POKEFINDER_TRACE", &value)?,
            None => false,
        };

        Ok(Self {
            location,
            log_dir: lookup("POKEFINDER_LOG_DIR").map(PathBuf::from),
            marker_policy,
            node_addr,
            trace,
        })
    }

    /// A logger writing `{name}.log` into the log directory, or only to the
    /// console when there is none.
    pub fn logger(&self, name: &str) -> Result<Logger, SightingError> {
        match &self.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .map_err(|e| SightingError::InvalidConfig(e.to_string()))?;
                Ok(Logger::new(dir, name)?)
            }
            None => Ok(Logger::console()),
        }
    }
}

fn parse_coordinate<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    name: &str,
    default: f64,
) -> Result<f64, SightingError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| SightingError::InvalidConfig(format!("{}={}", name, value))),
        None => Ok(default),
    }
}

fn parse_switch(name: &str, value: &str) -> Result<bool, SightingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "" | "0" | "false" | "off" => Ok(false),
        _ => Err(SightingError::InvalidConfig(format!("{}={}", name, value))),
    }
}
