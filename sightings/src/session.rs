use geo_store::GeoPoint;
use logger::{Color, Logger};
use rand::Rng;

use crate::backend::GeoBackend;
use crate::directions::DirectionsRequest;
use crate::errors::SightingError;
use crate::location::{AuthorizationStatus, LocationProvider};
use crate::marker::{Marker, MarkerPolicy, MarkerSet};
use crate::pokemon::{random_pokemon, Sighting};
use crate::query::SightingQuery;
use crate::service::SightingService;

/// Radius of the sightings query around the map center.
pub const SEARCH_RADIUS_KM: f64 = 2.5;

/// Side, in meters, of the region shown when the map first centers on the user.
pub const INITIAL_REGION_SPAN_M: f64 = 2000.0;

/// The part of the map that is visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center: GeoPoint,
    pub latitude_span_m: f64,
    pub longitude_span_m: f64,
}

impl MapRegion {
    pub fn around(center: GeoPoint, span_m: f64) -> Self {
        Self {
            center,
            latitude_span_m: span_m,
            longitude_span_m: span_m,
        }
    }
}

/// The state behind the map screen.
///
/// Every method is called from the UI loop, one at a time. Query events
/// produced elsewhere wait in the active query's channel until
/// [`MapSession::pump_events`] applies them, so the markers are only ever
/// touched from that loop.
pub struct MapSession<B: GeoBackend> {
    service: SightingService<B>,
    markers: MarkerSet,
    region: MapRegion,
    shows_user_location: bool,
    has_centered_once: bool,
    active_query: Option<SightingQuery>,
    logger: Logger,
}

impl<B: GeoBackend> MapSession<B> {
    /// Creates a session whose map shows `initial_center` until the user's
    /// location is known. No query runs until the first region change.
    pub fn new(
        service: SightingService<B>,
        initial_center: GeoPoint,
        policy: MarkerPolicy,
        logger: Logger,
    ) -> Self {
        Self {
            service,
            markers: MarkerSet::new(policy),
            region: MapRegion::around(initial_center, INITIAL_REGION_SPAN_M),
            shows_user_location: false,
            has_centered_once: false,
            active_query: None,
            logger,
        }
    }

    pub fn service(&self) -> &SightingService<B> {
        &self.service
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn region(&self) -> MapRegion {
        self.region
    }

    pub fn shows_user_location(&self) -> bool {
        self.shows_user_location
    }

    pub fn active_query(&self) -> Option<&SightingQuery> {
        self.active_query.as_ref()
    }

    /// The map screen became visible: show the user's location if allowed,
    /// otherwise ask for permission.
    pub fn on_appear(&mut self, provider: &mut dyn LocationProvider) {
        if provider.authorization_status() == AuthorizationStatus::AuthorizedWhenInUse {
            self.shows_user_location = true;
        } else {
            provider.request_when_in_use_authorization();
        }
    }

    pub fn on_authorization_changed(&mut self, status: AuthorizationStatus) {
        match status {
            AuthorizationStatus::AuthorizedWhenInUse => {
                self.shows_user_location = true;
                self.logger
                    .info("Location access granted", Color::Blue, false)
                    .ok();
            }
            AuthorizationStatus::Denied => {
                self.shows_user_location = false;
                self.markers.set_user(None);
                self.logger
                    .warn("Location access denied, the user is not shown", false)
                    .ok();
            }
            AuthorizationStatus::NotDetermined => {}
        }
    }

    /// Moves the user marker. The first update also centers the map on the
    /// user, which counts as a region change.
    ///
    /// # Returns
    /// The region the map must now show, if it was centered.
    pub fn on_user_location_updated(
        &mut self,
        location: GeoPoint,
    ) -> Result<Option<MapRegion>, SightingError> {
        if !self.shows_user_location {
            return Ok(None);
        }
        self.markers.set_user(Some(location));

        if self.has_centered_once {
            return Ok(None);
        }
        self.has_centered_once = true;
        self.region = MapRegion::around(location, INITIAL_REGION_SPAN_M);
        self.on_region_changed(location)?;

        Ok(Some(self.region))
    }

    /// Records a random Pokémon at the center of the map.
    pub fn spot_random_pokemon<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Sighting, SightingError> {
        let pokemon = random_pokemon(rng);
        self.service
            .record_sighting(self.region.center, pokemon)
            .map_err(|e| {
                self.logger
                    .error(&format!("Could not record Pokemon #{}: {}", pokemon, e), false)
                    .ok();
                e
            })
    }

    /// The map now shows a different place: the active query is replaced by
    /// one around `center`.
    pub fn on_region_changed(&mut self, center: GeoPoint) -> Result<(), SightingError> {
        self.region.center = center;

        if let Some(previous) = self.active_query.take() {
            if let Err(e) = self.service.cancel(previous) {
                self.logger
                    .warn(&format!("Could not cancel the previous query: {}", e), false)
                    .ok();
            }
        }

        match self.service.query_nearby(center, SEARCH_RADIUS_KM) {
            Ok(query) => {
                self.logger
                    .info(
                        &format!(
                            "Watching sightings within {} km of {}",
                            SEARCH_RADIUS_KM, center
                        ),
                        Color::Cyan,
                        false,
                    )
                    .ok();
                self.active_query = Some(query);
                Ok(())
            }
            Err(e) => {
                self.logger
                    .error(&format!("Could not query sightings: {}", e), false)
                    .ok();
                Err(e)
            }
        }
    }

    /// Applies the pending events of the active query to the markers.
    ///
    /// # Returns
    /// How many events changed the markers.
    pub fn pump_events(&mut self) -> usize {
        let Some(query) = &self.active_query else {
            return 0;
        };

        let changed = query
            .drain()
            .iter()
            .filter(|event| self.markers.apply(event))
            .count();

        if query.is_disconnected() {
            self.logger
                .warn("The sightings query stopped, waiting for the next region change", false)
                .ok();
            self.active_query = None;
        }

        changed
    }

    /// Directions to the sighting whose callout button was tapped.
    pub fn on_callout_tapped(&self, marker: &Marker) -> Option<DirectionsRequest> {
        match marker {
            Marker::Sighting(sighting) => Some(DirectionsRequest::to_sighting(sighting)),
            Marker::User(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::location::FixedLocationProvider;
    use crate::pokemon::PokemonId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn session(policy: MarkerPolicy) -> MapSession<LocalBackend> {
        let service = SightingService::new(LocalBackend::new(), Logger::console());
        MapSession::new(service, point(-34.6037, -58.3816), policy, Logger::console())
    }

    #[test]
    fn appear_requests_authorization_when_needed() {
        let mut session = session(MarkerPolicy::Dedupe);
        let here = point(1.0, 1.0);
        let mut provider =
            FixedLocationProvider::undetermined(here, AuthorizationStatus::AuthorizedWhenInUse);

        session.on_appear(&mut provider);
        assert_eq!(provider.requests(), 1);
        assert!(!session.shows_user_location());
        assert_eq!(session.on_user_location_updated(here).unwrap(), None);

        session.on_authorization_changed(provider.authorization_status());
        assert!(session.shows_user_location());

        let mut authorized = FixedLocationProvider::new(here);
        session.on_appear(&mut authorized);
        assert_eq!(authorized.requests(), 0);
    }

    #[test]
    fn denied_authorization_hides_the_user() {
        let mut session = session(MarkerPolicy::Dedupe);
        session.on_authorization_changed(AuthorizationStatus::Denied);

        assert!(!session.shows_user_location());
        assert_eq!(session.on_user_location_updated(point(1.0, 1.0)).unwrap(), None);
        assert!(session.markers().user().is_none());
    }

    #[test]
    fn first_location_update_centers_the_map_once() {
        let mut session = session(MarkerPolicy::Dedupe);
        session.on_authorization_changed(AuthorizationStatus::AuthorizedWhenInUse);
        let here = point(35.0, 139.0);

        let region = session.on_user_location_updated(here).unwrap().unwrap();
        assert_eq!(region, MapRegion::around(here, 2000.0));
        assert_eq!(session.region().center, here);
        assert_eq!(session.active_query().unwrap().center(), here);

        let later = point(35.001, 139.0);
        assert_eq!(session.on_user_location_updated(later).unwrap(), None);
        assert_eq!(session.region().center, here);
        assert_eq!(session.markers().user(), Some(later));
    }

    #[test]
    fn spot_records_one_sighting_at_the_map_center() {
        let mut session = session(MarkerPolicy::Dedupe);
        let center = point(48.8566, 2.3522);
        session.on_region_changed(center).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let sighting = session.spot_random_pokemon(&mut rng).unwrap();

        assert_eq!(sighting.coordinate, center);
        assert_eq!(
            session.service().last_sighting(sighting.pokemon).unwrap(),
            Some(sighting)
        );
        let database = session.service().backend().database();
        assert_eq!(database.lock().unwrap().store().len(), 1);

        assert_eq!(session.pump_events(), 1);
        assert_eq!(session.markers().sightings(), &[sighting]);
    }

    #[test]
    fn every_pokemon_is_recorded_at_the_center() {
        let session = session(MarkerPolicy::Dedupe);
        let center = session.region().center;

        for number in 1..=151 {
            let pokemon = PokemonId::new(number).unwrap();
            let sighting = session
                .service()
                .record_sighting(session.region().center, pokemon)
                .unwrap();
            assert_eq!(
                session.service().last_sighting(pokemon).unwrap(),
                Some(sighting)
            );
            assert_eq!(sighting.coordinate, center);
        }
    }

    #[test]
    fn moving_the_map_replaces_the_query() {
        let mut session = session(MarkerPolicy::Dedupe);
        let first = point(0.0, 0.0);
        let second = point(10.0, 10.0);

        session.on_region_changed(first).unwrap();
        let first_id = session.active_query().unwrap().id();
        session.on_region_changed(second).unwrap();

        let query = session.active_query().unwrap();
        assert_ne!(query.id(), first_id);
        assert_eq!(query.center(), second);
        assert_eq!(query.radius_km(), SEARCH_RADIUS_KM);

        let database = session.service().backend().database();
        assert_eq!(database.lock().unwrap().live_queries(), 1);
    }

    #[test]
    fn accumulate_shows_duplicates_when_revisiting_a_region() {
        let mut session = session(MarkerPolicy::Accumulate);
        let home = point(0.0, 0.0);
        let away = point(10.0, 10.0);
        let pikachu = PokemonId::new(25).unwrap();
        session.service().record_sighting(home, pikachu).unwrap();

        session.on_region_changed(home).unwrap();
        session.pump_events();
        session.on_region_changed(away).unwrap();
        session.pump_events();
        session.on_region_changed(home).unwrap();
        session.pump_events();

        assert_eq!(session.markers().find(pikachu).count(), 2);
    }

    #[test]
    fn dedupe_tracks_exits_and_moves() {
        let mut session = session(MarkerPolicy::Dedupe);
        let home = point(0.0, 0.0);
        let pikachu = PokemonId::new(25).unwrap();
        session.service().record_sighting(home, pikachu).unwrap();

        session.on_region_changed(home).unwrap();
        session.pump_events();
        session.on_region_changed(home).unwrap();
        session.pump_events();
        assert_eq!(session.markers().find(pikachu).count(), 1);

        let nearby = point(0.001, 0.001);
        session.service().record_sighting(nearby, pikachu).unwrap();
        session.pump_events();
        assert_eq!(
            session.markers().sightings(),
            &[Sighting::new(pikachu, nearby)]
        );

        session.service().record_sighting(point(5.0, 5.0), pikachu).unwrap();
        session.pump_events();
        assert!(session.markers().sightings().is_empty());
    }

    #[test]
    fn only_sighting_callouts_give_directions() {
        let session = session(MarkerPolicy::Dedupe);
        let sighting = Sighting::new(PokemonId::new(1).unwrap(), point(1.0, 2.0));

        let request = session
            .on_callout_tapped(&Marker::Sighting(sighting))
            .unwrap();
        assert_eq!(request.destination, sighting.coordinate);
        assert!(session
            .on_callout_tapped(&Marker::User(point(0.0, 0.0)))
            .is_none());
    }

    #[test]
    fn pump_without_a_query_does_nothing() {
        let mut session = session(MarkerPolicy::Dedupe);
        assert_eq!(session.pump_events(), 0);
    }
}
