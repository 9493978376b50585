//! Geo-indexed key/value store with live radius queries.
//!
//! Each key maps to exactly one location. Locations are indexed by geohash so
//! that "which keys are within R km of P" only scans the cells around P, and
//! live queries are told whenever a key enters, moves inside or leaves their
//! circle.

pub mod database;
pub mod distance;
pub mod errors;
pub mod geohash;
pub mod point;
pub mod query;
pub mod store;

pub use database::GeoDatabase;
pub use errors::GeoStoreError;
pub use point::GeoPoint;
pub use query::{EventKind, QueryCriteria, QueryEvent, QueryId};
pub use store::GeoStore;
