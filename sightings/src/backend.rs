use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use driver::GeoClient;
use geo_store::{GeoDatabase, GeoPoint, QueryEvent, QueryId};

use crate::errors::SightingError;

/// The geo-indexed store the Sighting Service talks to.
pub trait GeoBackend {
    /// Upserts the location of `key`.
    fn set_location(&self, key: &str, point: GeoPoint) -> Result<(), SightingError>;

    fn get_location(&self, key: &str) -> Result<Option<GeoPoint>, SightingError>;

    fn remove_location(&self, key: &str) -> Result<(), SightingError>;

    /// Starts a live circle query. The keys already inside arrive first as
    /// `Entered` events, followed by `Ready`.
    fn query(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<(QueryId, Receiver<QueryEvent>), SightingError>;

    fn cancel_query(&self, query_id: QueryId) -> Result<(), SightingError>;
}

/// A store living in this process.
#[derive(Clone, Default)]
pub struct LocalBackend {
    database: Arc<Mutex<GeoDatabase>>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares an existing database, so several services see the same sightings.
    pub fn from_database(database: Arc<Mutex<GeoDatabase>>) -> Self {
        Self { database }
    }

    pub fn database(&self) -> Arc<Mutex<GeoDatabase>> {
        Arc::clone(&self.database)
    }
}

impl GeoBackend for LocalBackend {
    fn set_location(&self, key: &str, point: GeoPoint) -> Result<(), SightingError> {
        self.database.lock()?.set_location(key, point)?;
        Ok(())
    }

    fn get_location(&self, key: &str) -> Result<Option<GeoPoint>, SightingError> {
        Ok(self.database.lock()?.get_location(key))
    }

    fn remove_location(&self, key: &str) -> Result<(), SightingError> {
        self.database.lock()?.remove_location(key);
        Ok(())
    }

    fn query(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<(QueryId, Receiver<QueryEvent>), SightingError> {
        let (sink, events) = mpsc::channel();
        let query_id = self.database.lock()?.query(center, radius_km, sink)?;
        Ok((query_id, events))
    }

    fn cancel_query(&self, query_id: QueryId) -> Result<(), SightingError> {
        self.database.lock()?.cancel_query(query_id)?;
        Ok(())
    }
}

/// A store hosted by a geo node, reached through the driver.
pub struct RemoteBackend {
    client: GeoClient,
}

impl RemoteBackend {
    pub fn new(client: GeoClient) -> Self {
        Self { client }
    }

    pub fn connect(addr: SocketAddr) -> Result<Self, SightingError> {
        Ok(Self::new(GeoClient::connect(addr)?))
    }

    /// Asks the node to log every request of this backend in full.
    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.client.set_tracing(tracing);
        self
    }
}

impl GeoBackend for RemoteBackend {
    fn set_location(&self, key: &str, point: GeoPoint) -> Result<(), SightingError> {
        Ok(self.client.set_location(key, point)?)
    }

    fn get_location(&self, key: &str) -> Result<Option<GeoPoint>, SightingError> {
        Ok(self.client.get_location(key)?)
    }

    fn remove_location(&self, key: &str) -> Result<(), SightingError> {
        Ok(self.client.remove_location(key)?)
    }

    fn query(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<(QueryId, Receiver<QueryEvent>), SightingError> {
        Ok(self.client.query(center, radius_km)?)
    }

    fn cancel_query(&self, query_id: QueryId) -> Result<(), SightingError> {
        Ok(self.client.cancel_query(query_id)?)
    }
}
