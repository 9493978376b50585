use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;

use uuid::Uuid;

use crate::distance::distance_m;
use crate::errors::GeoStoreError;
use crate::point::GeoPoint;
use crate::store::validate_radius;

/// Identifier of a live circle query.
pub type QueryId = Uuid;

/// The kind of membership change reported by a live query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A key is now inside the query circle.
    Entered,
    /// A key that was inside left the circle or was removed.
    Exited,
    /// A key inside the circle changed its location and is still inside.
    Moved,
    /// Every key that was inside when the query started (or was last
    /// updated) has been reported.
    Ready,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Entered => "ENTERED",
            EventKind::Exited => "EXITED",
            EventKind::Moved => "MOVED",
            EventKind::Ready => "READY",
        };
        write!(f, "{}", name)
    }
}

/// A membership change of a live query.
///
/// `Ready` events carry an empty key and no location. `Exited` events carry
/// the location that made the key leave, or its last location if it was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvent {
    pub query_id: QueryId,
    pub kind: EventKind,
    pub key: String,
    pub location: Option<GeoPoint>,
}

impl QueryEvent {
    pub fn entered(query_id: QueryId, key: &str, location: GeoPoint) -> Self {
        Self::with_location(query_id, EventKind::Entered, key, location)
    }

    pub fn exited(query_id: QueryId, key: &str, location: GeoPoint) -> Self {
        Self::with_location(query_id, EventKind::Exited, key, location)
    }

    pub fn moved(query_id: QueryId, key: &str, location: GeoPoint) -> Self {
        Self::with_location(query_id, EventKind::Moved, key, location)
    }

    pub fn ready(query_id: QueryId) -> Self {
        Self {
            query_id,
            kind: EventKind::Ready,
            key: String::new(),
            location: None,
        }
    }

    fn with_location(query_id: QueryId, kind: EventKind, key: &str, location: GeoPoint) -> Self {
        Self {
            query_id,
            kind,
            key: key.to_string(),
            location: Some(location),
        }
    }
}

/// The circle watched by a live query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryCriteria {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl QueryCriteria {
    pub fn new(center: GeoPoint, radius_km: f64) -> Result<Self, GeoStoreError> {
        validate_radius(radius_km)?;
        Ok(Self { center, radius_km })
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        distance_m(&self.center, point) <= self.radius_km * 1000.0
    }
}

struct LiveQuery {
    criteria: QueryCriteria,
    members: HashMap<String, GeoPoint>,
    sink: Sender<QueryEvent>,
}

impl LiveQuery {
    fn deliver(&self, event: QueryEvent) -> bool {
        self.sink.send(event).is_ok()
    }
}

/// Tracks live queries and the keys currently inside each of them.
///
/// Queries whose receiving end has been dropped are forgotten the next time an
/// event is delivered to them.
#[derive(Default)]
pub struct QueryRegistry {
    queries: HashMap<QueryId, LiveQuery>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a query whose current members are `members`, reports each of
    /// them as entered and then signals `Ready`.
    pub fn register(
        &mut self,
        criteria: QueryCriteria,
        members: Vec<(String, GeoPoint)>,
        sink: Sender<QueryEvent>,
    ) -> QueryId {
        let query_id = Uuid::new_v4();
        let query = LiveQuery {
            criteria,
            members: HashMap::new(),
            sink,
        };
        self.queries.insert(query_id, query);
        self.replace_members(query_id, criteria, members);

        query_id
    }

    /// Changes the circle of a query. Members that fall out are reported as
    /// exited, new ones as entered, followed by `Ready`.
    pub fn update(
        &mut self,
        query_id: QueryId,
        criteria: QueryCriteria,
        members: Vec<(String, GeoPoint)>,
    ) -> Result<(), GeoStoreError> {
        if !self.queries.contains_key(&query_id) {
            return Err(GeoStoreError::UnknownQuery(query_id.to_string()));
        }
        self.replace_members(query_id, criteria, members);
        Ok(())
    }

    pub fn cancel(&mut self, query_id: QueryId) -> Result<(), GeoStoreError> {
        self.queries
            .remove(&query_id)
            .map(|_| ())
            .ok_or_else(|| GeoStoreError::UnknownQuery(query_id.to_string()))
    }

    pub fn contains(&self, query_id: QueryId) -> bool {
        self.queries.contains_key(&query_id)
    }

    pub fn criteria(&self, query_id: QueryId) -> Option<QueryCriteria> {
        self.queries.get(&query_id).map(|query| query.criteria)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Reports the effect of `key` being stored at `location` to every query.
    pub fn on_location_set(&mut self, key: &str, location: GeoPoint) {
        let mut disconnected = Vec::new();

        for (query_id, query) in self.queries.iter_mut() {
            let was_inside = query.members.get(key).copied();
            let is_inside = query.criteria.contains(&location);

            let event = match (was_inside, is_inside) {
                (None, true) => {
                    query.members.insert(key.to_string(), location);
                    QueryEvent::entered(*query_id, key, location)
                }
                (Some(previous), true) if previous != location => {
                    query.members.insert(key.to_string(), location);
                    QueryEvent::moved(*query_id, key, location)
                }
                (Some(_), false) => {
                    query.members.remove(key);
                    QueryEvent::exited(*query_id, key, location)
                }
                _ => continue,
            };

            if !query.deliver(event) {
                disconnected.push(*query_id);
            }
        }

        self.forget(disconnected);
    }

    /// Reports the removal of `key` to every query that contained it.
    pub fn on_location_removed(&mut self, key: &str) {
        let mut disconnected = Vec::new();

        for (query_id, query) in self.queries.iter_mut() {
            if let Some(last) = query.members.remove(key) {
                if !query.deliver(QueryEvent::exited(*query_id, key, last)) {
                    disconnected.push(*query_id);
                }
            }
        }

        self.forget(disconnected);
    }

    fn replace_members(
        &mut self,
        query_id: QueryId,
        criteria: QueryCriteria,
        members: Vec<(String, GeoPoint)>,
    ) {
        let Some(query) = self.queries.get_mut(&query_id) else {
            return;
        };
        query.criteria = criteria;

        let mut events = Vec::new();
        let next: HashMap<String, GeoPoint> = members.into_iter().collect();

        for (key, last) in query.members.iter() {
            if !next.contains_key(key) {
                events.push(QueryEvent::exited(query_id, key, *last));
            }
        }
        for (key, location) in next.iter() {
            if !query.members.contains_key(key) {
                events.push(QueryEvent::entered(query_id, key, *location));
            }
        }
        events.push(QueryEvent::ready(query_id));
        query.members = next;

        let connected = events.into_iter().all(|event| query.deliver(event));
        if !connected {
            self.queries.remove(&query_id);
        }
    }

    fn forget(&mut self, query_ids: Vec<QueryId>) {
        for query_id in query_ids {
            self.queries.remove(&query_id);
        }
    }
}
