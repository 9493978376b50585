//! Pokémon sightings on a map.
//!
//! A [`SightingService`] records which Pokémon was seen where in a
//! geo-indexed store and watches the sightings around a point. A
//! [`MapSession`] drives the map screen on top of it: it spots random
//! Pokémon at the map center, re-queries when the map moves and turns query
//! events into markers.

pub mod backend;
pub mod config;
pub mod directions;
pub mod errors;
pub mod location;
pub mod marker;
pub mod pokemon;
pub mod query;
pub mod service;
pub mod session;

pub use backend::{GeoBackend, LocalBackend, RemoteBackend};
pub use config::Config;
pub use directions::DirectionsRequest;
pub use errors::SightingError;
pub use location::{AuthorizationStatus, FixedLocationProvider, LocationProvider};
pub use marker::{Marker, MarkerPolicy, MarkerSet};
pub use pokemon::{random_pokemon, PokemonId, Sighting};
pub use query::{SightingEvent, SightingQuery};
pub use service::SightingService;
pub use session::{MapRegion, MapSession, SEARCH_RADIUS_KM};
