use std::io::{Cursor, Read};

use geo_store::GeoPoint;
use uuid::Uuid;

use crate::errors::ProtocolError;

/// A 2 bytes unsigned integer.
pub type Short = u16;

pub trait FromCursorDeserializable {
    fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self, ProtocolError>
    where
        Self: Sized;
}

fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], ProtocolError> {
    let mut bytes = [0u8; N];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| ProtocolError::CursorError)?;
    Ok(bytes)
}

impl FromCursorDeserializable for u8 {
    fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self, ProtocolError> {
        Ok(read_array::<1>(cursor)?[0])
    }
}

impl FromCursorDeserializable for Short {
    fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self, ProtocolError> {
        Ok(Short::from_be_bytes(read_array(cursor)?))
    }
}

impl FromCursorDeserializable for f64 {
    fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self, ProtocolError> {
        Ok(f64::from_be_bytes(read_array(cursor)?))
    }
}

impl FromCursorDeserializable for Uuid {
    fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self, ProtocolError> {
        Ok(Uuid::from_bytes(read_array(cursor)?))
    }
}

/// A point travels as two big-endian `f64`: latitude then longitude.
impl FromCursorDeserializable for GeoPoint {
    fn deserialize(cursor: &mut Cursor<&[u8]>) -> Result<Self, ProtocolError> {
        let latitude = f64::deserialize(cursor)?;
        let longitude = f64::deserialize(cursor)?;

        GeoPoint::new(latitude, longitude).map_err(|_| ProtocolError::DeserializationError)
    }
}

pub fn point_to_bytes(point: &GeoPoint) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16);
    bytes.extend_from_slice(&point.latitude().to_be_bytes());
    bytes.extend_from_slice(&point.longitude().to_be_bytes());
    bytes
}

/// An optional point is a presence byte (`0x00` or `0x01`) followed by the point if present.
pub fn optional_point_to_bytes(point: Option<&GeoPoint>) -> Vec<u8> {
    match point {
        Some(point) => {
            let mut bytes = vec![0x01];
            bytes.extend_from_slice(&point_to_bytes(point));
            bytes
        }
        None => vec![0x00],
    }
}

pub fn optional_point_from_bytes(
    cursor: &mut Cursor<&[u8]>,
) -> Result<Option<GeoPoint>, ProtocolError> {
    match u8::deserialize(cursor)? {
        0x00 => Ok(None),
        0x01 => Ok(Some(GeoPoint::deserialize(cursor)?)),
        _ => Err(ProtocolError::InvalidVariant),
    }
}

pub trait WireString {
    fn from_string_bytes(cursor: &mut Cursor<&[u8]>) -> std::result::Result<Self, ProtocolError>
    where
        Self: Sized;

    fn to_string_bytes(&self) -> std::result::Result<Vec<u8>, ProtocolError>;
}

impl WireString for String {
    fn from_string_bytes(cursor: &mut Cursor<&[u8]>) -> std::result::Result<Self, ProtocolError> {
        let len = Short::deserialize(cursor)? as usize;

        let mut string_bytes = vec![0u8; len];
        cursor
            .read_exact(&mut string_bytes)
            .map_err(|_| ProtocolError::CursorError)?;

        String::from_utf8(string_bytes).map_err(|_| ProtocolError::DeserializationError)
    }

    fn to_string_bytes(&self) -> std::result::Result<Vec<u8>, ProtocolError> {
        let len = Short::try_from(self.len()).map_err(|_| ProtocolError::SerializationError)?;

        let mut bytes = Vec::with_capacity(2 + self.len());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(self.as_bytes());

        Ok(bytes)
    }
}
