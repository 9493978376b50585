use std::str::FromStr;

use geo_store::GeoPoint;

use crate::errors::SightingError;
use crate::pokemon::{PokemonId, Sighting};
use crate::query::SightingEvent;

/// Something drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    /// The user's own position.
    User(GeoPoint),
    Sighting(Sighting),
}

/// The accessory button shown in a marker's callout.
#[derive(Debug, Clone, PartialEq)]
pub struct CalloutAccessory {
    pub image: String,
}

/// How a marker is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    /// Name of the sprite drawn for the marker.
    pub sprite: String,
    /// Markers sharing a reuse identifier share their view.
    pub reuse_identifier: &'static str,
    /// Callout accessory, for markers that show a callout.
    pub callout: Option<CalloutAccessory>,
}

impl Marker {
    pub fn coordinate(&self) -> GeoPoint {
        match self {
            Marker::User(coordinate) => *coordinate,
            Marker::Sighting(sighting) => sighting.coordinate,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Marker::User(_) => "You".to_string(),
            Marker::Sighting(sighting) => format!("Pokemon #{}", sighting.pokemon),
        }
    }

    pub fn style(&self) -> MarkerStyle {
        match self {
            Marker::User(_) => MarkerStyle {
                sprite: "ash".to_string(),
                reuse_identifier: "User",
                callout: None,
            },
            Marker::Sighting(sighting) => MarkerStyle {
                sprite: sighting.pokemon.to_string(),
                reuse_identifier: "Pokemon",
                callout: Some(CalloutAccessory {
                    image: "map".to_string(),
                }),
            },
        }
    }
}

/// How query events change the sighting markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPolicy {
    /// Every `Entered` event adds a marker, even for a Pokémon already shown,
    /// and markers are never removed or moved.
    Accumulate,
    /// One marker per Pokémon: `Entered` and `Moved` place it, `Exited` removes it.
    #[default]
    Dedupe,
}

impl FromStr for MarkerPolicy {
    type Err = SightingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accumulate" => Ok(MarkerPolicy::Accumulate),
            "dedupe" => Ok(MarkerPolicy::Dedupe),
            other => Err(SightingError::InvalidConfig(format!(
                "unknown marker policy {:?} (expected dedupe or accumulate)",
                other
            ))),
        }
    }
}

/// The markers currently on the map.
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    policy: MarkerPolicy,
    user: Option<GeoPoint>,
    sightings: Vec<Sighting>,
}

impl MarkerSet {
    pub fn new(policy: MarkerPolicy) -> Self {
        Self {
            policy,
            user: None,
            sightings: Vec::new(),
        }
    }

    pub fn policy(&self) -> MarkerPolicy {
        self.policy
    }

    pub fn set_user(&mut self, location: Option<GeoPoint>) {
        self.user = location;
    }

    pub fn user(&self) -> Option<GeoPoint> {
        self.user
    }

    /// Applies a query event. Returns whether the markers changed.
    pub fn apply(&mut self, event: &SightingEvent) -> bool {
        match (self.policy, event) {
            (_, SightingEvent::Ready) => false,
            (MarkerPolicy::Accumulate, SightingEvent::Entered(sighting)) => {
                self.sightings.push(*sighting);
                true
            }
            (MarkerPolicy::Accumulate, _) => false,
            (MarkerPolicy::Dedupe, SightingEvent::Entered(sighting))
            | (MarkerPolicy::Dedupe, SightingEvent::Moved(sighting)) => self.upsert(*sighting),
            (MarkerPolicy::Dedupe, SightingEvent::Exited(pokemon)) => {
                let before = self.sightings.len();
                self.sightings.retain(|shown| shown.pokemon != *pokemon);
                self.sightings.len() != before
            }
        }
    }

    fn upsert(&mut self, sighting: Sighting) -> bool {
        match self
            .sightings
            .iter_mut()
            .find(|shown| shown.pokemon == sighting.pokemon)
        {
            Some(shown) if *shown == sighting => false,
            Some(shown) => {
                *shown = sighting;
                true
            }
            None => {
                self.sightings.push(sighting);
                true
            }
        }
    }

    pub fn sightings(&self) -> &[Sighting] {
        &self.sightings
    }

    /// Sighting markers showing `pokemon`.
    pub fn find(&self, pokemon: PokemonId) -> impl Iterator<Item = &Sighting> {
        self.sightings
            .iter()
            .filter(move |sighting| sighting.pokemon == pokemon)
    }

    /// All markers, the user's first.
    pub fn markers(&self) -> Vec<Marker> {
        self.user
            .map(Marker::User)
            .into_iter()
            .chain(self.sightings.iter().copied().map(Marker::Sighting))
            .collect()
    }
}
