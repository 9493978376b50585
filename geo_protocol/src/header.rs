use crate::{errors::ProtocolError, ByteSerializable, Serializable};

/// Length in bytes of every frame header.
pub const HEADER_LENGTH: usize = 9;

/// Largest body a frame may announce. Bigger frames are rejected before
/// anything is allocated for them.
pub const MAX_BODY_LENGTH: u32 = 256 * 1024;

/// Stream id used by the server for pushed query events.
pub const EVENT_STREAM: i16 = -1;

/// Each frame contains a fixed size header (9 bytes) followed by a variable size body.
#[derive(Debug)]
pub struct FrameHeader {
    pub version: Version,
    pub flags: Flags,
    pub stream: i16,
    pub opcode: Opcode,
    pub body_length: u32,
}

impl FrameHeader {
    pub fn new(
        version: Version,
        flags: Flags,
        stream: i16,
        opcode: Opcode,
        body_length: u32,
    ) -> Self {
        Self {
            version,
            flags,
            stream,
            opcode,
            body_length,
        }
    }
}

impl Serializable for FrameHeader {
    /// 0         8        16        24        32         40
    /// +---------+---------+---------+---------+---------+
    /// | version |  flags  |      stream       | opcode  |
    /// +---------+---------+---------+---------+---------+
    /// |                length                 |
    /// +---------+---------+---------+---------+
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buffer = Vec::with_capacity(HEADER_LENGTH);

        buffer.push(self.version.to_byte()?);
        buffer.push(self.flags.to_byte()?);
        buffer.extend_from_slice(&self.stream.to_be_bytes());
        buffer.push(self.opcode.to_byte()?);
        buffer.extend_from_slice(&self.body_length.to_be_bytes());

        Ok(buffer)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(ProtocolError::NotEnoughBytes);
        }

        let version = Version::from_byte(bytes[0])?;
        let flags = Flags::from_byte(bytes[1])?;
        let stream = i16::from_be_bytes([bytes[2], bytes[3]]);
        let opcode = Opcode::from_byte(bytes[4])?;
        let body_length = u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
        if body_length > MAX_BODY_LENGTH {
            return Err(ProtocolError::FrameTooLarge(body_length));
        }

        Ok(Self {
            version,
            flags,
            stream,
            opcode,
            body_length,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Opcode {
    Error = 0x00,
    Startup = 0x01,
    Ready = 0x02,
    SetLocation = 0x03,
    GetLocation = 0x04,
    RemoveLocation = 0x05,
    Query = 0x06,
    UpdateQuery = 0x07,
    CancelQuery = 0x08,
    Result = 0x09,
    Event = 0x0A,
}

impl ByteSerializable for Opcode {
    fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x00 => Ok(Opcode::Error),
            0x01 => Ok(Opcode::Startup),
            0x02 => Ok(Opcode::Ready),
            0x03 => Ok(Opcode::SetLocation),
            0x04 => Ok(Opcode::GetLocation),
            0x05 => Ok(Opcode::RemoveLocation),
            0x06 => Ok(Opcode::Query),
            0x07 => Ok(Opcode::UpdateQuery),
            0x08 => Ok(Opcode::CancelQuery),
            0x09 => Ok(Opcode::Result),
            0x0A => Ok(Opcode::Event),
            _ => Err(ProtocolError::InvalidCode),
        }
    }

    fn to_byte(&self) -> std::result::Result<u8, ProtocolError> {
        Ok(*self as u8)
    }
}

/// The version is a single byte that indicate both the direction of the message
/// (request or response) and the version of the protocol in use.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Version {
    RequestV1 = 0x01,
    ResponseV1 = 0x81,
}

impl ByteSerializable for Version {
    fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x01 => Ok(Version::RequestV1),
            0x81 => Ok(Version::ResponseV1),
            _ => Err(ProtocolError::InvalidCode),
        }
    }

    fn to_byte(&self) -> std::result::Result<u8, ProtocolError> {
        Ok(*self as u8)
    }
}

enum FlagCodes {
    Tracing = 0x01,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Flags {
    /// Asks the server to log the request in full.
    pub tracing: bool,
}

impl ByteSerializable for Flags {
    fn to_byte(&self) -> std::result::Result<u8, ProtocolError> {
        let mut flags = 0u8;

        if self.tracing {
            flags |= FlagCodes::Tracing as u8;
        };

        Ok(flags)
    }

    fn from_byte(flags: u8) -> Result<Self, ProtocolError> {
        let tracing = flags & FlagCodes::Tracing as u8 != 0;

        Ok(Self { tracing })
    }
}
