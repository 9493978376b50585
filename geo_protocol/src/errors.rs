use std::fmt;

/// Enum representing errors that can occur while encoding or decoding frames.
#[derive(Debug)]
pub enum ProtocolError {
    SerializationError,
    DeserializationError,
    NotEnoughBytes,
    CursorError,
    InvalidCode,
    InvalidVariant,
    /// A header announced a body longer than the protocol allows.
    FrameTooLarge(u32),
    /// The peer closed the connection before a whole frame was read.
    ConnectionClosed,
    IoError(std::io::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            ProtocolError::SerializationError => "Serialization error occurred",
            ProtocolError::DeserializationError => "Deserialization error occurred",
            ProtocolError::NotEnoughBytes => "Not enough bytes for operation",
            ProtocolError::CursorError => "Cursor error encountered",
            ProtocolError::InvalidCode => "Invalid code encountered",
            ProtocolError::InvalidVariant => "Invalid variant provided",
            ProtocolError::ConnectionClosed => "Connection closed by peer",
            ProtocolError::FrameTooLarge(length) => {
                return write!(f, "Frame body of {} bytes is too large", length)
            }
            ProtocolError::IoError(e) => return write!(f, "I/O error: {}", e),
        };
        write!(f, "{}", description)
    }
}

impl std::error::Error for ProtocolError {}

impl From<std::io::Error> for ProtocolError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
            _ => ProtocolError::IoError(error),
        }
    }
}
