use std::io::Cursor;

use geo_store::GeoStoreError;

use crate::{
    errors::ProtocolError,
    types::{FromCursorDeserializable, WireString},
    Serializable,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ErrorCode {
    ServerError = 0x0000,
    ProtocolError = 0x000A,
    InvalidCoordinate = 0x2200,
    InvalidKey = 0x2201,
    InvalidRadius = 0x2202,
    UnknownQuery = 0x2300,
}

impl ErrorCode {
    pub fn from_u16(value: u16) -> Result<ErrorCode, ProtocolError> {
        let error = match value {
            0x0000 => ErrorCode::ServerError,
            0x000A => ErrorCode::ProtocolError,
            0x2200 => ErrorCode::InvalidCoordinate,
            0x2201 => ErrorCode::InvalidKey,
            0x2202 => ErrorCode::InvalidRadius,
            0x2300 => ErrorCode::UnknownQuery,
            _ => return Err(ProtocolError::InvalidCode),
        };

        Ok(error)
    }

    pub fn to_u16(&self) -> u16 {
        *self as u16
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Something unexpected happened. This indicates a server-side bug.
    ServerError(String),
    /// Some client message triggered a protocol violation (for instance
    /// a request sent before a STARTUP one has been sent).
    ProtocolError(String),
    /// A coordinate outside the valid latitude/longitude range.
    InvalidCoordinate(String),
    /// A key that is empty or contains control characters.
    InvalidKey(String),
    /// A negative or non-finite query radius.
    InvalidRadius(String),
    /// The query id does not name a live query of this connection.
    UnknownQuery(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ServerError(_) => ErrorCode::ServerError,
            Error::ProtocolError(_) => ErrorCode::ProtocolError,
            Error::InvalidCoordinate(_) => ErrorCode::InvalidCoordinate,
            Error::InvalidKey(_) => ErrorCode::InvalidKey,
            Error::InvalidRadius(_) => ErrorCode::InvalidRadius,
            Error::UnknownQuery(_) => ErrorCode::UnknownQuery,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::ServerError(message)
            | Error::ProtocolError(message)
            | Error::InvalidCoordinate(message)
            | Error::InvalidKey(message)
            | Error::InvalidRadius(message)
            | Error::UnknownQuery(message) => message,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (0x{:04X}): {}", self.code(), self.code().to_u16(), self.message())
    }
}

impl From<&GeoStoreError> for Error {
    fn from(error: &GeoStoreError) -> Self {
        let message = error.to_string();
        match error {
            GeoStoreError::InvalidCoordinate(_, _) => Error::InvalidCoordinate(message),
            GeoStoreError::InvalidKey(_) => Error::InvalidKey(message),
            GeoStoreError::InvalidRadius(_) => Error::InvalidRadius(message),
            GeoStoreError::UnknownQuery(_) => Error::UnknownQuery(message),
            GeoStoreError::InvalidPrecision(_) => Error::ServerError(message),
        }
    }
}

impl Serializable for Error {
    /// code (2 bytes) | message ([string])
    fn to_bytes(&self) -> std::result::Result<Vec<u8>, ProtocolError> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&self.code().to_u16().to_be_bytes());
        bytes.extend_from_slice(&self.message().to_string().to_string_bytes()?);

        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);
        let code = ErrorCode::from_u16(u16::deserialize(&mut cursor)?)?;
        let message = String::from_string_bytes(&mut cursor)?;

        let error = match code {
            ErrorCode::ServerError => Error::ServerError(message),
            ErrorCode::ProtocolError => Error::ProtocolError(message),
            ErrorCode::InvalidCoordinate => Error::InvalidCoordinate(message),
            ErrorCode::InvalidKey => Error::InvalidKey(message),
            ErrorCode::InvalidRadius => Error::InvalidRadius(message),
            ErrorCode::UnknownQuery => Error::UnknownQuery(message),
        };

        Ok(error)
    }
}
