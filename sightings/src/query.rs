use std::cell::Cell;
use std::sync::mpsc::{Receiver, TryRecvError};

use geo_store::{EventKind, GeoPoint, QueryEvent, QueryId};
use logger::Logger;

use crate::pokemon::{PokemonId, Sighting};

/// A membership change of a nearby-sightings query.
#[derive(Debug, Clone, PartialEq)]
pub enum SightingEvent {
    /// A sighting is now within the radius.
    Entered(Sighting),
    /// A sighting left the radius or was removed.
    Exited(PokemonId),
    /// A sighting inside the radius changed its coordinate.
    Moved(Sighting),
    /// The sightings that were already inside have all been reported.
    Ready,
}

/// A live query for the sightings around a point.
///
/// Events are read without blocking with [`SightingQuery::try_next`]. Keys of
/// the store that are not Pokémon numbers are skipped with a warning.
pub struct SightingQuery {
    id: QueryId,
    center: GeoPoint,
    radius_km: f64,
    events: Receiver<QueryEvent>,
    disconnected: Cell<bool>,
    logger: Logger,
}

impl SightingQuery {
    pub(crate) fn new(
        id: QueryId,
        center: GeoPoint,
        radius_km: f64,
        events: Receiver<QueryEvent>,
        logger: Logger,
    ) -> Self {
        Self {
            id,
            center,
            radius_km,
            events,
            disconnected: Cell::new(false),
            logger,
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Whether the store stopped sending events (the query was cancelled or
    /// the connection was lost).
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.get()
    }

    /// The next pending event, if any.
    pub fn try_next(&self) -> Option<SightingEvent> {
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected.set(true);
                    return None;
                }
            };
            if let Some(event) = self.translate(event) {
                return Some(event);
            }
        }
    }

    /// Every pending event.
    pub fn drain(&self) -> Vec<SightingEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    fn translate(&self, event: QueryEvent) -> Option<SightingEvent> {
        if event.kind == EventKind::Ready {
            return Some(SightingEvent::Ready);
        }

        let pokemon = match event.key.parse::<PokemonId>() {
            Ok(pokemon) => pokemon,
            Err(_) => {
                self.logger
                    .warn(
                        &format!("Skipping {} event for key {:?}", event.kind, event.key),
                        false,
                    )
                    .ok();
                return None;
            }
        };

        match (event.kind, event.location) {
            (EventKind::Exited, _) => Some(SightingEvent::Exited(pokemon)),
            (EventKind::Entered, Some(coordinate)) => {
                Some(SightingEvent::Entered(Sighting::new(pokemon, coordinate)))
            }
            (EventKind::Moved, Some(coordinate)) => {
                Some(SightingEvent::Moved(Sighting::new(pokemon, coordinate)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use uuid::Uuid;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn store_events_become_sighting_events() {
        let (tx, rx) = mpsc::channel();
        let id = Uuid::new_v4();
        let query = SightingQuery::new(id, point(0.0, 0.0), 2.5, rx, Logger::console());
        let here = point(0.001, 0.0);
        let pikachu = PokemonId::new(25).unwrap();

        tx.send(QueryEvent::entered(id, "25", here)).unwrap();
        tx.send(QueryEvent::entered(id, "not-a-pokemon", here)).unwrap();
        tx.send(QueryEvent::ready(id)).unwrap();
        tx.send(QueryEvent::moved(id, "25", point(0.002, 0.0))).unwrap();
        tx.send(QueryEvent::exited(id, "25", point(1.0, 0.0))).unwrap();

        assert_eq!(
            query.drain(),
            vec![
                SightingEvent::Entered(Sighting::new(pikachu, here)),
                SightingEvent::Ready,
                SightingEvent::Moved(Sighting::new(pikachu, point(0.002, 0.0))),
                SightingEvent::Exited(pikachu),
            ]
        );
        assert!(!query.is_disconnected());

        drop(tx);
        assert_eq!(query.try_next(), None);
        assert!(query.is_disconnected());
    }
}
