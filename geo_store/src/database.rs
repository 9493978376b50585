use std::sync::mpsc::Sender;

use crate::errors::GeoStoreError;
use crate::point::GeoPoint;
use crate::query::{QueryCriteria, QueryEvent, QueryId, QueryRegistry};
use crate::store::GeoStore;

/// A geo store together with the live queries watching it.
///
/// Every write goes through the database so that live queries observe it.
#[derive(Default)]
pub struct GeoDatabase {
    store: GeoStore,
    queries: QueryRegistry,
}

impl GeoDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: GeoStore) -> Self {
        Self {
            store,
            queries: QueryRegistry::new(),
        }
    }

    pub fn store(&self) -> &GeoStore {
        &self.store
    }

    /// Upserts the location of `key` and notifies the live queries.
    pub fn set_location(
        &mut self,
        key: &str,
        point: GeoPoint,
    ) -> Result<Option<GeoPoint>, GeoStoreError> {
        let previous = self.store.set_location(key, point)?;
        self.queries.on_location_set(key, point);
        Ok(previous)
    }

    pub fn get_location(&self, key: &str) -> Option<GeoPoint> {
        self.store.get_location(key)
    }

    pub fn remove_location(&mut self, key: &str) -> Option<GeoPoint> {
        let removed = self.store.remove_location(key)?;
        self.queries.on_location_removed(key);
        Some(removed)
    }

    /// Starts a live query over the circle of `radius_km` around `center`.
    ///
    /// # Parameters
    /// - `center`: center of the watched circle.
    /// - `radius_km`: radius of the circle in kilometers.
    /// - `sink`: channel where membership changes are delivered. The keys
    ///   already inside the circle are sent as `Entered` right away, followed by `Ready`.
    ///
    /// # Returns
    /// The id used to update or cancel the query.
    pub fn query(
        &mut self,
        center: GeoPoint,
        radius_km: f64,
        sink: Sender<QueryEvent>,
    ) -> Result<QueryId, GeoStoreError> {
        let criteria = QueryCriteria::new(center, radius_km)?;
        let members = self.store.keys_in_radius(&center, radius_km)?;
        Ok(self.queries.register(criteria, members, sink))
    }

    pub fn update_query(
        &mut self,
        query_id: QueryId,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<(), GeoStoreError> {
        let criteria = QueryCriteria::new(center, radius_km)?;
        if !self.queries.contains(query_id) {
            return Err(GeoStoreError::UnknownQuery(query_id.to_string()));
        }
        let members = self.store.keys_in_radius(&center, radius_km)?;
        self.queries.update(query_id, criteria, members)
    }

    pub fn cancel_query(&mut self, query_id: QueryId) -> Result<(), GeoStoreError> {
        self.queries.cancel(query_id)
    }

    pub fn live_queries(&self) -> usize {
        self.queries.len()
    }
}
