use std::fmt::{self, Display};

use driver::ClientError;
use geo_store::GeoStoreError;
use logger::LoggerError;

/// Errors of the Sighting Service and the map session.
#[derive(Debug)]
pub enum SightingError {
    /// A Pokémon number outside `[1, 151]`.
    InvalidPokemon(i64),
    /// A store key that is not a canonical Pokémon number.
    InvalidPokemonKey(String),
    /// The in-process store rejected the operation.
    StoreError(GeoStoreError),
    /// The node could not be reached or rejected the operation.
    ClientError(ClientError),
    /// Error related to the logger.
    LoggerError(LoggerError),
    /// Error related to lock acquisition.
    LockError,
    /// A configuration value that cannot be used.
    InvalidConfig(String),
}

impl Display for SightingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SightingError::InvalidPokemon(number) => {
                write!(f, "Invalid Pokemon number: {} (expected 1 to 151)", number)
            }
            SightingError::InvalidPokemonKey(key) => {
                write!(f, "Invalid Pokemon key: {:?}", key)
            }
            SightingError::StoreError(e) => write!(f, "Store Error: {}", e),
            SightingError::ClientError(e) => write!(f, "Client Error: {}", e),
            SightingError::LoggerError(e) => write!(f, "Logger Error: {}", e),
            SightingError::LockError => write!(f, "Failed to acquire lock"),
            SightingError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SightingError {}

impl From<GeoStoreError> for SightingError {
    fn from(error: GeoStoreError) -> Self {
        SightingError::StoreError(error)
    }
}

impl From<ClientError> for SightingError {
    fn from(error: ClientError) -> Self {
        SightingError::ClientError(error)
    }
}

impl From<LoggerError> for SightingError {
    fn from(error: LoggerError) -> Self {
        SightingError::LoggerError(error)
    }
}

impl<T> From<std::sync::PoisonError<T>> for SightingError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        SightingError::LockError
    }
}
