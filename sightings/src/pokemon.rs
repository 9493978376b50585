use std::fmt;
use std::str::FromStr;

use geo_store::GeoPoint;
use rand::Rng;

use crate::errors::SightingError;

/// Number of Pokémon that can be sighted.
pub const POKEMON_COUNT: u16 = 151;

/// The number of a Pokémon, always in `[1, 151]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PokemonId(u16);

impl PokemonId {
    pub fn new(number: i64) -> Result<Self, SightingError> {
        match u16::try_from(number) {
            Ok(n) if (1..=POKEMON_COUNT).contains(&n) => Ok(Self(n)),
            _ => Err(SightingError::InvalidPokemon(number)),
        }
    }

    pub fn number(&self) -> u16 {
        self.0
    }

    /// The key the sighting is stored under.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PokemonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a store key back into a Pokémon number.
impl FromStr for PokemonId {
    type Err = SightingError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        // Only canonical keys: "25", not "025" or "+25".
        if key.is_empty() || key.starts_with('0') || !key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SightingError::InvalidPokemonKey(key.to_string()));
        }
        let number: i64 = key
            .parse()
            .map_err(|_| SightingError::InvalidPokemonKey(key.to_string()))?;
        Self::new(number)
    }
}

/// Picks which Pokémon was sighted: a uniform draw over `[1, 151]`.
pub fn random_pokemon<R: Rng + ?Sized>(rng: &mut R) -> PokemonId {
    PokemonId(rng.gen_range(1..=POKEMON_COUNT))
}

/// A recorded (Pokémon, coordinate) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub pokemon: PokemonId,
    pub coordinate: GeoPoint,
}

impl Sighting {
    pub fn new(pokemon: PokemonId, coordinate: GeoPoint) -> Self {
        Self {
            pokemon,
            coordinate,
        }
    }
}
