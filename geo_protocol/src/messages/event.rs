use std::io::Cursor;

use geo_store::{EventKind, QueryEvent, QueryId};

use crate::{
    errors::ProtocolError,
    types::{
        optional_point_from_bytes, optional_point_to_bytes, FromCursorDeserializable, WireString,
    },
    ByteSerializable, Serializable,
};

impl ByteSerializable for EventKind {
    fn to_byte(&self) -> Result<u8, ProtocolError> {
        let byte = match self {
            EventKind::Entered => 0x00,
            EventKind::Exited => 0x01,
            EventKind::Moved => 0x02,
            EventKind::Ready => 0x03,
        };
        Ok(byte)
    }

    fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x00 => Ok(EventKind::Entered),
            0x01 => Ok(EventKind::Exited),
            0x02 => Ok(EventKind::Moved),
            0x03 => Ok(EventKind::Ready),
            _ => Err(ProtocolError::InvalidCode),
        }
    }
}

impl Serializable for QueryEvent {
    /// query id (16 bytes) | kind (1 byte) | key ([string]) | location ([optional point])
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = self.query_id.as_bytes().to_vec();
        bytes.push(self.kind.to_byte()?);
        bytes.extend_from_slice(&self.key.to_string_bytes()?);
        bytes.extend_from_slice(&optional_point_to_bytes(self.location.as_ref()));

        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);
        let query_id = QueryId::deserialize(&mut cursor)?;
        let kind = EventKind::from_byte(u8::deserialize(&mut cursor)?)?;
        let key = String::from_string_bytes(&mut cursor)?;
        let location = optional_point_from_bytes(&mut cursor)?;

        Ok(Self {
            query_id,
            kind,
            key,
            location,
        })
    }
}
