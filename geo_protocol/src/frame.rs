use std::io::Read;

use geo_store::QueryEvent;

use crate::{
    errors::ProtocolError,
    header::{
        Flags, FrameHeader, Opcode, Version, EVENT_STREAM, HEADER_LENGTH, MAX_BODY_LENGTH,
    },
    messages::{
        error::Error,
        location::{LocationKey, SetLocation},
        outcome::Outcome,
        query::{CancelQuery, Query, UpdateQuery},
    },
    Serializable,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Initialize the connection.
    Startup,
    /// Indicates that the server is ready to process requests.
    Ready,
    /// Stores (or moves) the location of a key.
    SetLocation(SetLocation),
    /// Asks for the location of a key.
    GetLocation(LocationKey),
    /// Deletes a key and its location.
    RemoveLocation(LocationKey),
    /// Starts a live circle query.
    Query(Query),
    /// Moves or resizes a live query.
    UpdateQuery(UpdateQuery),
    /// Stops a live query.
    CancelQuery(CancelQuery),
    /// The result to a request.
    Result(Outcome),
    /// Indicates an error processing a request.
    Error(Error),
    /// A membership change of a live query, pushed by the server.
    Event(QueryEvent),
}

impl Frame {
    pub fn opcode(&self) -> Opcode {
        match self {
            Frame::Startup => Opcode::Startup,
            Frame::Ready => Opcode::Ready,
            Frame::SetLocation(_) => Opcode::SetLocation,
            Frame::GetLocation(_) => Opcode::GetLocation,
            Frame::RemoveLocation(_) => Opcode::RemoveLocation,
            Frame::Query(_) => Opcode::Query,
            Frame::UpdateQuery(_) => Opcode::UpdateQuery,
            Frame::CancelQuery(_) => Opcode::CancelQuery,
            Frame::Result(_) => Opcode::Result,
            Frame::Error(_) => Opcode::Error,
            Frame::Event(_) => Opcode::Event,
        }
    }

    pub fn version(&self) -> Version {
        match self {
            Frame::Startup
            | Frame::SetLocation(_)
            | Frame::GetLocation(_)
            | Frame::RemoveLocation(_)
            | Frame::Query(_)
            | Frame::UpdateQuery(_)
            | Frame::CancelQuery(_) => Version::RequestV1,
            Frame::Ready | Frame::Result(_) | Frame::Error(_) | Frame::Event(_) => {
                Version::ResponseV1
            }
        }
    }

    fn body_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Frame::Startup | Frame::Ready => Ok(Vec::new()),
            Frame::SetLocation(set) => set.to_bytes(),
            Frame::GetLocation(key) | Frame::RemoveLocation(key) => key.to_bytes(),
            Frame::Query(query) => query.to_bytes(),
            Frame::UpdateQuery(update) => update.to_bytes(),
            Frame::CancelQuery(cancel) => cancel.to_bytes(),
            Frame::Result(outcome) => outcome.to_bytes(),
            Frame::Error(error) => error.to_bytes(),
            Frame::Event(event) => event.to_bytes(),
        }
    }

    fn from_body(opcode: Opcode, body: &[u8]) -> Result<Self, ProtocolError> {
        let frame = match opcode {
            Opcode::Startup => Frame::Startup,
            Opcode::Ready => Frame::Ready,
            Opcode::SetLocation => Frame::SetLocation(SetLocation::from_bytes(body)?),
            Opcode::GetLocation => Frame::GetLocation(LocationKey::from_bytes(body)?),
            Opcode::RemoveLocation => Frame::RemoveLocation(LocationKey::from_bytes(body)?),
            Opcode::Query => Frame::Query(Query::from_bytes(body)?),
            Opcode::UpdateQuery => Frame::UpdateQuery(UpdateQuery::from_bytes(body)?),
            Opcode::CancelQuery => Frame::CancelQuery(CancelQuery::from_bytes(body)?),
            Opcode::Result => Frame::Result(Outcome::from_bytes(body)?),
            Opcode::Error => Frame::Error(Error::from_bytes(body)?),
            Opcode::Event => Frame::Event(QueryEvent::from_bytes(body)?),
        };

        Ok(frame)
    }
}

/// A frame together with the header fields chosen by the sender.
///
/// Responses reuse the stream id of the request they answer, so a client can
/// have several requests in flight. Events pushed by the server use
/// [`EVENT_STREAM`].
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub stream: i16,
    pub flags: Flags,
    pub frame: Frame,
}

impl Envelope {
    pub fn new(stream: i16, frame: Frame) -> Self {
        Self {
            stream,
            flags: Flags::default(),
            frame,
        }
    }

    pub fn event(event: QueryEvent) -> Self {
        Self::new(EVENT_STREAM, Frame::Event(event))
    }

    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.flags.tracing = tracing;
        self
    }

    /// Blocks until a whole frame has been read from `reader` and decodes it.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ProtocolError> {
        Self::from_bytes(&read_frame_bytes(reader)?)
    }
}

/// Blocks until a whole frame (header and body) has been read from `reader`.
///
/// Returns [`ProtocolError::ConnectionClosed`] if the peer hangs up, even in
/// the middle of a frame, and [`ProtocolError::FrameTooLarge`] without reading
/// the body if the header announces more than [`MAX_BODY_LENGTH`] bytes.
pub fn read_frame_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = vec![0u8; HEADER_LENGTH];
    reader.read_exact(&mut bytes)?;
    let header = FrameHeader::from_bytes(&bytes)?;

    let length =
        usize::try_from(header.body_length).map_err(|_| ProtocolError::DeserializationError)?;
    bytes.resize(HEADER_LENGTH + length, 0);
    reader.read_exact(&mut bytes[HEADER_LENGTH..])?;

    Ok(bytes)
}

impl Serializable for Envelope {
    /// 0         8        16        24        32         40
    /// +---------+---------+---------+---------+---------+
    /// | version |  flags  |      stream       | opcode  |
    /// +---------+---------+---------+---------+---------+
    /// |                length                 |         |
    /// +---------+---------+---------+---------+         +
    /// |                                                 |
    /// .                ...  body ...                    .
    /// .                                                 .
    /// +-------------------------------------------------+
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let body_bytes = self.frame.body_bytes()?;
        let length =
            u32::try_from(body_bytes.len()).map_err(|_| ProtocolError::SerializationError)?;
        if length > MAX_BODY_LENGTH {
            return Err(ProtocolError::FrameTooLarge(length));
        }

        let header = FrameHeader::new(
            self.frame.version(),
            self.flags,
            self.stream,
            self.frame.opcode(),
            length,
        );

        let mut bytes = header.to_bytes()?;
        bytes.extend_from_slice(&body_bytes);

        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let header = FrameHeader::from_bytes(bytes)?;
        let length =
            usize::try_from(header.body_length).map_err(|_| ProtocolError::DeserializationError)?;

        let body = bytes
            .get(HEADER_LENGTH..HEADER_LENGTH + length)
            .ok_or(ProtocolError::NotEnoughBytes)?;

        Ok(Self {
            stream: header.stream,
            flags: header.flags,
            frame: Frame::from_body(header.opcode, body)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use geo_store::GeoPoint;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn startup_is_a_bare_header() {
        let bytes = Envelope::new(0, Frame::Startup).to_bytes().unwrap();

        assert_eq!(
            bytes,
            vec![0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn ready_is_a_response() {
        let bytes = Envelope::new(3, Frame::Ready).to_bytes().unwrap();

        assert_eq!(bytes[0], 0x81);
        assert_eq!(&bytes[2..4], &[0x00, 0x03]);
        assert_eq!(bytes[4], 0x02);
    }

    #[test]
    fn set_location_envelope() {
        let point = GeoPoint::new(-34.6037, -58.3816).unwrap();
        let envelope = Envelope::new(
            12,
            Frame::SetLocation(SetLocation::new("25".to_string(), point)),
        )
        .with_tracing(true);

        let bytes = envelope.to_bytes().unwrap();

        assert_eq!(bytes[1], 0x01);
        assert_eq!(&bytes[5..9], &20u32.to_be_bytes());
        assert_eq!(bytes.len(), HEADER_LENGTH + 20);
        assert_eq!(Envelope::from_bytes(&bytes).unwrap(), envelope);
    }

    #[test]
    fn events_travel_on_the_event_stream() {
        let event = QueryEvent::ready(Uuid::new_v4());
        let envelope = Envelope::event(event.clone());

        let bytes = envelope.to_bytes().unwrap();

        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);
        let decoded = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.stream, EVENT_STREAM);
        assert_eq!(decoded.frame, Frame::Event(event));
    }

    #[test]
    fn read_from_consumes_frames_one_by_one() {
        let mut stream = Envelope::new(1, Frame::Result(Outcome::Void))
            .to_bytes()
            .unwrap();
        stream.extend(
            Envelope::new(2, Frame::Error(Error::InvalidKey("empty key".to_string())))
                .to_bytes()
                .unwrap(),
        );
        let mut reader = Cursor::new(stream);

        let first = Envelope::read_from(&mut reader).unwrap();
        let second = Envelope::read_from(&mut reader).unwrap();

        assert_eq!(first.stream, 1);
        assert_eq!(first.frame, Frame::Result(Outcome::Void));
        assert_eq!(second.stream, 2);
        assert!(matches!(second.frame, Frame::Error(Error::InvalidKey(_))));
        assert!(matches!(
            Envelope::read_from(&mut reader),
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[test]
    fn truncated_body_is_not_enough_bytes() {
        let bytes = Envelope::new(0, Frame::GetLocation(LocationKey::new("abc".to_string())))
            .to_bytes()
            .unwrap();

        assert!(matches!(
            Envelope::from_bytes(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::NotEnoughBytes)
        ));
    }

    #[test]
    fn oversized_frame_is_rejected_before_its_body() {
        let mut bytes = vec![0x01, 0x00, 0x00, 0x01, 0x03];
        bytes.extend_from_slice(&(MAX_BODY_LENGTH + 1).to_be_bytes());
        let mut reader = Cursor::new(bytes);

        assert!(matches!(
            read_frame_bytes(&mut reader),
            Err(ProtocolError::FrameTooLarge(length)) if length == MAX_BODY_LENGTH + 1
        ));
        assert_eq!(reader.position(), HEADER_LENGTH as u64);
    }
}
