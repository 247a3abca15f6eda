//! Wire frame shared by the BMS and ESC buses.
//!
//! ```text
//! [command:1][address:2 LE][parameter:1][length:1][payload:0..64][checksum:1]
//! ```
//!
//! * `ReadRequest` frames carry no payload; the length byte announces how many
//!   bytes the answer must contain.
//! * `ReadResponse` and `Status` frames carry exactly `length` payload bytes.
//! * `Status` frames store `length + 1` in the length byte. Encoding adds the
//!   offset, decoding removes it.
//! * The checksum is the plain sum of every preceding byte modulo 256.
use core::fmt;

use crate::core::{Payload, CHECKSUM_LEN, HEADER_LEN, MAX_FRAME_LEN, MAX_PAYLOAD_LEN};
use crate::error::FrameError;

//==================================================================================COMMAND
/// Command byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Ask a device for the current value of a parameter.
    ReadRequest = 0x46,
    /// Answer to a `ReadRequest`.
    ReadResponse = 0x47,
    /// Unsolicited value broadcast by a device.
    Status = 0x57,
}

impl Command {
    /// Whether frames of this kind carry data bytes.
    pub const fn carries_payload(self) -> bool {
        !matches!(self, Command::ReadRequest)
    }

    /// Length byte as written on the wire for a given data length.
    pub const fn wire_length(self, data_length: u8) -> u8 {
        match self {
            Command::Status => data_length.wrapping_add(1),
            _ => data_length,
        }
    }

    /// Inverse of [`Command::wire_length`].
    pub fn data_length_from_wire(self, wire_length: u8) -> Result<u8, FrameError> {
        match self {
            Command::Status => wire_length.checked_sub(1).ok_or(FrameError::InvalidLength),
            _ => Ok(wire_length),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::ReadRequest => "ReadRequest",
            Command::ReadResponse => "ReadResponse",
            Command::Status => "Status",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x46 => Ok(Command::ReadRequest),
            0x47 => Ok(Command::ReadResponse),
            0x57 => Ok(Command::Status),
            other => Err(FrameError::InvalidCommand(other)),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}

//==================================================================================HELPERS
/// Additive checksum: sum of all bytes modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

/// Total frame length on the wire for a command and data length.
pub const fn packet_length(command: Command, data_length: u8) -> usize {
    let payload = if command.carries_payload() {
        data_length as usize
    } else {
        0
    };
    HEADER_LEN + payload + CHECKSUM_LEN
}

/// Decode the fixed five-byte header. Convenience alias of [`Header::decode`].
pub fn decode_header(bytes: &[u8]) -> Result<Header, FrameError> {
    Header::decode(bytes)
}

//==================================================================================HEADER
/// Decoded fixed part of a frame, with the Status length offset removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub command: Command,
    pub address: u16,
    pub parameter: u8,
    pub data_length: u8,
}

impl Header {
    /// Parse the first [`HEADER_LEN`] bytes of `bytes`.
    ///
    /// Rejects unknown command codes and lengths no known parameter can have,
    /// so the caller can size the remaining read from the result.
    ///
    /// A ReadRequest carries no payload, so its length byte is never capped.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let header = Self::parse(bytes)?;
        header.check_payload_len()?;
        Ok(header)
    }

    /// Field extraction without the payload cap.
    fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::TooShort { len: bytes.len() });
        }

        let command = Command::try_from(bytes[0])?;
        let address = u16::from_le_bytes([bytes[1], bytes[2]]);
        let parameter = bytes[3];
        let data_length = command.data_length_from_wire(bytes[4])?;

        Ok(Self {
            command,
            address,
            parameter,
            data_length,
        })
    }

    fn check_payload_len(&self) -> Result<(), FrameError> {
        if self.command.carries_payload() && self.data_length as usize > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong {
                len: self.data_length as usize,
            });
        }
        Ok(())
    }

    /// Full frame length announced by this header.
    pub const fn packet_length(&self) -> usize {
        packet_length(self.command, self.data_length)
    }

    /// Bytes still to read once the header is in hand.
    pub const fn remaining_length(&self) -> usize {
        self.packet_length() - HEADER_LEN
    }
}

//==================================================================================FRAME
/// One complete wire message.
///
/// The constructor enforces the payload rule, so every `Frame` in hand
/// encodes without argument errors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    command: Command,
    address: u16,
    parameter: u8,
    data_length: u8,
    payload: Option<Payload>,
}

impl Frame {
    /// Build a frame, validating payload presence and length against `command`.
    ///
    /// `ReadRequest` accepts `None` or an empty slice; `ReadResponse` and
    /// `Status` require exactly `data_length` bytes.
    pub fn new(
        command: Command,
        address: u16,
        parameter: u8,
        data_length: u8,
        payload: Option<&[u8]>,
    ) -> Result<Self, FrameError> {
        if data_length as usize > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong {
                len: data_length as usize,
            });
        }

        let payload = match (command.carries_payload(), payload) {
            (false, None) => None,
            (false, Some(data)) if data.is_empty() => None,
            (false, Some(_)) => return Err(FrameError::InvalidArgument),
            (true, Some(data)) if data.len() == data_length as usize => {
                Some(Payload::from_slice(data).map_err(|_| FrameError::InvalidArgument)?)
            }
            (true, _) => return Err(FrameError::InvalidArgument),
        };

        Ok(Self {
            command,
            address,
            parameter,
            data_length,
            payload,
        })
    }

    pub fn read_request(address: u16, parameter: u8, data_length: u8) -> Result<Self, FrameError> {
        Self::new(Command::ReadRequest, address, parameter, data_length, None)
    }

    pub fn read_response(address: u16, parameter: u8, data: &[u8]) -> Result<Self, FrameError> {
        let data_length = Self::length_of(data)?;
        Self::new(Command::ReadResponse, address, parameter, data_length, Some(data))
    }

    pub fn status(address: u16, parameter: u8, data: &[u8]) -> Result<Self, FrameError> {
        let data_length = Self::length_of(data)?;
        Self::new(Command::Status, address, parameter, data_length, Some(data))
    }

    fn length_of(data: &[u8]) -> Result<u8, FrameError> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong { len: data.len() });
        }
        Ok(data.len() as u8)
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn parameter(&self) -> u8 {
        self.parameter
    }

    /// Data length without the Status wire offset.
    pub fn data_length(&self) -> u8 {
        self.data_length
    }

    /// Data bytes; `None` for `ReadRequest`.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn into_payload(self) -> Option<Payload> {
        self.payload
    }

    pub fn header(&self) -> Header {
        Header {
            command: self.command,
            address: self.address,
            parameter: self.parameter,
            data_length: self.data_length,
        }
    }

    /// Number of bytes [`Frame::encode`] writes.
    pub fn encoded_len(&self) -> usize {
        packet_length(self.command, self.data_length)
    }

    //==================================================================================ENCODE
    /// Serialize into `buffer` and return the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.encoded_len();
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall {
                needed: len,
                available: buffer.len(),
            });
        }

        buffer[0] = self.command.into();
        buffer[1..3].copy_from_slice(&self.address.to_le_bytes());
        buffer[3] = self.parameter;
        buffer[4] = self.command.wire_length(self.data_length);

        if let Some(payload) = &self.payload {
            buffer[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
        }

        buffer[len - 1] = checksum(&buffer[..len - 1]);
        Ok(len)
    }

    /// Serialize into an owned, stack-allocated buffer.
    pub fn to_bytes(&self) -> heapless::Vec<u8, MAX_FRAME_LEN> {
        let mut buffer = [0u8; MAX_FRAME_LEN];
        // A constructed frame always fits MAX_FRAME_LEN.
        let len = self.encode(&mut buffer).unwrap_or(0);
        heapless::Vec::from_slice(&buffer[..len]).unwrap_or_default()
    }

    //==================================================================================DECODE
    /// Parse a complete frame.
    ///
    /// Checks run in wire order of trust: minimum size, checksum, header,
    /// total length against the header, then the payload cap. A payload
    /// length byte above [`MAX_PAYLOAD_LEN`] therefore surfaces as
    /// [`FrameError::LengthMismatch`] on any frame of realistic size.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(FrameError::TooShort { len: bytes.len() });
        }

        let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        let calculated = checksum(body);
        let read = trailer[0];
        if calculated != read {
            return Err(FrameError::ChecksumMismatch { calculated, read });
        }

        // Length before cap: an oversized announcement is a length error here.
        let header = Header::parse(body)?;
        let expected = header.packet_length();
        if bytes.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        header.check_payload_len()?;

        if !header.command.carries_payload() {
            // Any length byte is a valid request; `new` only caps what we emit.
            return Ok(Self {
                command: header.command,
                address: header.address,
                parameter: header.parameter,
                data_length: header.data_length,
                payload: None,
            });
        }

        let payload = &body[HEADER_LEN..HEADER_LEN + header.data_length as usize];
        Self::new(
            header.command,
            header.address,
            header.parameter,
            header.data_length,
            Some(payload),
        )
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:04X} {:02X} - ",
            self.command.name(),
            self.address,
            self.parameter
        )?;
        if let Some(payload) = &self.payload {
            for byte in payload {
                write!(f, "{byte:02x}")?;
            }
        }
        Ok(())
    }
}
