use geo_store::GeoPoint;
use logger::{Color, Logger};

use crate::backend::GeoBackend;
use crate::errors::SightingError;
use crate::pokemon::{PokemonId, Sighting};
use crate::query::SightingQuery;

/// Records sightings and watches the ones around a point.
pub struct SightingService<B: GeoBackend> {
    backend: B,
    logger: Logger,
}

impl<B: GeoBackend> SightingService<B> {
    pub fn new(backend: B, logger: Logger) -> Self {
        Self { backend, logger }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stores `pokemon` at `coordinate`, replacing its previous sighting.
    pub fn record_sighting(
        &self,
        coordinate: GeoPoint,
        pokemon: PokemonId,
    ) -> Result<Sighting, SightingError> {
        self.backend.set_location(&pokemon.key(), coordinate)?;
        // The sighting is stored by now; a failed log line must not undo it.
        self.logger
            .info(
                &format!("Recorded Pokemon #{} at {}", pokemon, coordinate),
                Color::Green,
                false,
            )
            .ok();
        Ok(Sighting::new(pokemon, coordinate))
    }

    /// Where `pokemon` was last sighted, if anywhere.
    pub fn last_sighting(&self, pokemon: PokemonId) -> Result<Option<Sighting>, SightingError> {
        let coordinate = self.backend.get_location(&pokemon.key())?;
        Ok(coordinate.map(|coordinate| Sighting::new(pokemon, coordinate)))
    }

    /// Forgets the sighting of `pokemon`.
    pub fn remove_sighting(&self, pokemon: PokemonId) -> Result<(), SightingError> {
        self.backend.remove_location(&pokemon.key())
    }

    /// Starts watching the sightings within `radius_km` of `center`.
    pub fn query_nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<SightingQuery, SightingError> {
        let (query_id, events) = self.backend.query(center, radius_km)?;
        Ok(SightingQuery::new(
            query_id,
            center,
            radius_km,
            events,
            self.logger.clone(),
        ))
    }

    /// Stops a query. No event is delivered after this returns.
    pub fn cancel(&self, query: SightingQuery) -> Result<(), SightingError> {
        self.backend.cancel_query(query.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::query::SightingEvent;
    use geo_store::distance::distance_km;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn pokemon(number: i64) -> PokemonId {
        PokemonId::new(number).unwrap()
    }

    fn service() -> SightingService<LocalBackend> {
        SightingService::new(LocalBackend::new(), Logger::console())
    }

    fn entered(events: Vec<SightingEvent>) -> Vec<Sighting> {
        events
            .into_iter()
            .filter_map(|event| match event {
                SightingEvent::Entered(sighting) => Some(sighting),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn re_recording_overwrites_the_coordinate() {
        let service = service();
        let first = point(-34.6037, -58.3816);
        let second = point(-34.9011, -56.1645);

        service.record_sighting(first, pokemon(25)).unwrap();
        service.record_sighting(second, pokemon(25)).unwrap();

        assert_eq!(
            service.last_sighting(pokemon(25)).unwrap(),
            Some(Sighting::new(pokemon(25), second))
        );
        let near_first = service.query_nearby(first, 2.5).unwrap();
        assert!(entered(near_first.drain()).is_empty());
        let near_second = service.query_nearby(second, 2.5).unwrap();
        assert_eq!(
            entered(near_second.drain()),
            vec![Sighting::new(pokemon(25), second)]
        );
    }

    #[test]
    fn query_reports_exactly_the_sightings_within_the_radius() {
        let service = service();
        let center = point(-34.6037, -58.3816);
        // 0.02 degrees of latitude is about 2.22 km, 0.025 about 2.78 km.
        let candidates = [
            (1, point(-34.6037, -58.3816)),
            (2, point(-34.6237, -58.3816)),
            (3, point(-34.5837, -58.3816)),
            (4, point(-34.6287, -58.3816)),
            (5, point(-34.6037, -58.4116)),
            (6, point(-34.6037, -58.3516)),
            (7, point(-34.6187, -58.3666)),
            (8, point(0.0, 0.0)),
        ];
        for (number, coordinate) in candidates {
            service.record_sighting(coordinate, pokemon(number)).unwrap();
        }

        let query = service.query_nearby(center, 2.5).unwrap();
        let mut found: Vec<u16> = entered(query.drain())
            .iter()
            .map(|sighting| sighting.pokemon.number())
            .collect();
        found.sort();

        let mut expected: Vec<u16> = candidates
            .iter()
            .filter(|(_, coordinate)| distance_km(&center, coordinate) <= 2.5)
            .map(|(number, _)| *number as u16)
            .collect();
        expected.sort();

        assert_eq!(found, expected);
        assert!(found.contains(&1) && found.contains(&2) && !found.contains(&4));
        assert!(!found.contains(&8));
    }

    #[test]
    fn live_query_sees_new_sightings_until_cancelled() {
        let service = service();
        let center = point(35.6762, 139.6503);

        let query = service.query_nearby(center, 2.5).unwrap();
        assert_eq!(query.drain(), vec![SightingEvent::Ready]);

        service.record_sighting(center, pokemon(150)).unwrap();
        assert_eq!(
            query.drain(),
            vec![SightingEvent::Entered(Sighting::new(pokemon(150), center))]
        );

        service.remove_sighting(pokemon(150)).unwrap();
        assert_eq!(query.drain(), vec![SightingEvent::Exited(pokemon(150))]);

        let id = query.id();
        service.cancel(query).unwrap();
        assert!(service.backend().cancel_query(id).is_err());
    }

    #[test]
    fn recording_succeeds_when_the_log_file_is_gone() {
        let log_dir = std::env::temp_dir().join(format!("sightings_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&log_dir).unwrap();
        let logger = Logger::new(&log_dir, "service").unwrap();
        std::fs::remove_dir_all(&log_dir).unwrap();

        let service = SightingService::new(LocalBackend::new(), logger);
        let coordinate = point(1.0, 1.0);

        assert_eq!(
            service.record_sighting(coordinate, pokemon(7)).unwrap(),
            Sighting::new(pokemon(7), coordinate)
        );
        assert_eq!(
            service.last_sighting(pokemon(7)).unwrap(),
            Some(Sighting::new(pokemon(7), coordinate))
        );
    }

    #[test]
    fn invalid_radius_is_reported() {
        let service = service();

        assert!(matches!(
            service.query_nearby(point(0.0, 0.0), f64::NAN),
            Err(SightingError::StoreError(_))
        ));
    }
}
