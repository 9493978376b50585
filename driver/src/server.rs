use geo_protocol::{
    frame::{Envelope, Frame},
    header::HEADER_LENGTH,
    messages::{
        location::SetLocation,
        query::{Query, UpdateQuery},
    },
    Serializable,
};
use geo_store::QueryId;

#[derive(Debug, PartialEq)]
pub enum RequestError {
    /// The frame decoded fine but is not something a client may send.
    InvalidFrame { stream: i16 },
    /// The bytes are not a valid frame.
    InvalidConversion { stream: i16 },
}

impl RequestError {
    /// Stream the error response must be sent on.
    pub fn stream(&self) -> i16 {
        match self {
            RequestError::InvalidFrame { stream } | RequestError::InvalidConversion { stream } => {
                *stream
            }
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::InvalidFrame { stream } => {
                write!(f, "Unexpected frame on stream {}", stream)
            }
            RequestError::InvalidConversion { stream } => {
                write!(f, "Malformed frame on stream {}", stream)
            }
        }
    }
}

impl std::error::Error for RequestError {}

#[derive(Debug, PartialEq)]
pub enum Request {
    Startup,
    SetLocation(SetLocation),
    GetLocation(String),
    RemoveLocation(String),
    Query(Query),
    UpdateQuery(UpdateQuery),
    CancelQuery(QueryId),
}

/// A decoded request together with the header fields the response depends on.
#[derive(Debug, PartialEq)]
pub struct ClientRequest {
    pub stream: i16,
    pub tracing: bool,
    pub request: Request,
}

/// Decodes the bytes of a whole request frame.
pub fn handle_client_request(bytes: &[u8]) -> Result<ClientRequest, RequestError> {
    let stream = stream_of(bytes);
    let envelope =
        Envelope::from_bytes(bytes).map_err(|_| RequestError::InvalidConversion { stream })?;

    let request = match envelope.frame {
        Frame::Startup => Request::Startup,
        Frame::SetLocation(set) => Request::SetLocation(set),
        Frame::GetLocation(location) => Request::GetLocation(location.key),
        Frame::RemoveLocation(location) => Request::RemoveLocation(location.key),
        Frame::Query(query) => Request::Query(query),
        Frame::UpdateQuery(update) => Request::UpdateQuery(update),
        Frame::CancelQuery(cancel) => Request::CancelQuery(cancel.query_id),
        _ => return Err(RequestError::InvalidFrame { stream }),
    };

    Ok(ClientRequest {
        stream: envelope.stream,
        tracing: envelope.flags.tracing,
        request,
    })
}

fn stream_of(bytes: &[u8]) -> i16 {
    if bytes.len() < HEADER_LENGTH {
        return 0;
    }
    i16::from_be_bytes([bytes[2], bytes[3]])
}
