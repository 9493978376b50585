use std::io::Cursor;

use geo_store::GeoPoint;

use crate::{
    errors::ProtocolError,
    types::{point_to_bytes, FromCursorDeserializable, WireString},
    Serializable,
};

/// Upserts the location of a key.
#[derive(Debug, Clone, PartialEq)]
pub struct SetLocation {
    pub key: String,
    pub point: GeoPoint,
}

impl SetLocation {
    pub fn new(key: String, point: GeoPoint) -> Self {
        Self { key, point }
    }
}

impl Serializable for SetLocation {
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = self.key.to_string_bytes()?;
        bytes.extend_from_slice(&point_to_bytes(&self.point));
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);
        let key = String::from_string_bytes(&mut cursor)?;
        let point = GeoPoint::deserialize(&mut cursor)?;

        Ok(Self { key, point })
    }
}

/// Body of the requests that only name a key (`GetLocation`, `RemoveLocation`).
#[derive(Debug, Clone, PartialEq)]
pub struct LocationKey {
    pub key: String,
}

impl LocationKey {
    pub fn new(key: String) -> Self {
        Self { key }
    }
}

impl Serializable for LocationKey {
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        self.key.to_string_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let key = String::from_string_bytes(&mut Cursor::new(bytes))?;
        Ok(Self { key })
    }
}
