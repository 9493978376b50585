use std::io::Cursor;

use geo_store::{GeoPoint, QueryId};

use crate::{
    errors::ProtocolError,
    types::{point_to_bytes, FromCursorDeserializable},
    Serializable,
};

/// Starts a live circle query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl Query {
    pub fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self { center, radius_km }
    }
}

impl Serializable for Query {
    /// center (16 bytes) | radius in km (8 bytes)
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = point_to_bytes(&self.center);
        bytes.extend_from_slice(&self.radius_km.to_be_bytes());
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);
        let center = GeoPoint::deserialize(&mut cursor)?;
        let radius_km = f64::deserialize(&mut cursor)?;

        Ok(Self { center, radius_km })
    }
}

/// Moves or resizes a live query previously started on the same connection.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub query_id: QueryId,
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl UpdateQuery {
    pub fn new(query_id: QueryId, center: GeoPoint, radius_km: f64) -> Self {
        Self {
            query_id,
            center,
            radius_km,
        }
    }
}

impl Serializable for UpdateQuery {
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = self.query_id.as_bytes().to_vec();
        bytes.extend_from_slice(&point_to_bytes(&self.center));
        bytes.extend_from_slice(&self.radius_km.to_be_bytes());
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);
        let query_id = QueryId::deserialize(&mut cursor)?;
        let center = GeoPoint::deserialize(&mut cursor)?;
        let radius_km = f64::deserialize(&mut cursor)?;

        Ok(Self {
            query_id,
            center,
            radius_km,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelQuery {
    pub query_id: QueryId,
}

impl CancelQuery {
    pub fn new(query_id: QueryId) -> Self {
        Self { query_id }
    }
}

impl Serializable for CancelQuery {
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.query_id.as_bytes().to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let query_id = QueryId::deserialize(&mut Cursor::new(bytes))?;
        Ok(Self { query_id })
    }
}
