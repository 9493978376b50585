use std::io::Cursor;

use geo_store::{GeoPoint, QueryId};

use crate::{
    errors::ProtocolError,
    types::{optional_point_from_bytes, optional_point_to_bytes, FromCursorDeserializable},
    Serializable,
};

/// The successful result of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// For results carrying no information (`SetLocation`, `RemoveLocation`,
    /// `UpdateQuery`, `CancelQuery`).
    Void,
    /// The answer to `GetLocation`; `None` when the key is not stored.
    Location(Option<GeoPoint>),
    /// The answer to `Query`: the id the query's events will carry.
    QueryStarted(QueryId),
}

#[derive(Debug, Clone, Copy)]
enum OutcomeKind {
    Void = 0x00,
    Location = 0x01,
    QueryStarted = 0x02,
}

impl Serializable for Outcome {
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let bytes = match self {
            Outcome::Void => vec![OutcomeKind::Void as u8],
            Outcome::Location(point) => {
                let mut bytes = vec![OutcomeKind::Location as u8];
                bytes.extend_from_slice(&optional_point_to_bytes(point.as_ref()));
                bytes
            }
            Outcome::QueryStarted(query_id) => {
                let mut bytes = vec![OutcomeKind::QueryStarted as u8];
                bytes.extend_from_slice(query_id.as_bytes());
                bytes
            }
        };

        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);

        let outcome = match u8::deserialize(&mut cursor)? {
            0x00 => Outcome::Void,
            0x01 => Outcome::Location(optional_point_from_bytes(&mut cursor)?),
            0x02 => Outcome::QueryStarted(QueryId::deserialize(&mut cursor)?),
            _ => return Err(ProtocolError::InvalidVariant),
        };

        Ok(outcome)
    }
}
