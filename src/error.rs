//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (frame encoding/decoding,
//! catalog lookups, value decoding, cache storage and bus exchanges).
//!
//! Only [`CatalogError`] and [`FrameError::InvalidArgument`] signal programming
//! or configuration mistakes. Everything else is expected on a lossy bus and is
//! absorbed by the retry loops of the session and the bridge tasks.
use thiserror_no_std::Error;

//==================================================================================FRAME_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while building, encoding or decoding a wire frame.
pub enum FrameError {
    /// Payload presence or length contradicts the command kind.
    #[error("Invalid argument: payload does not fit the command")]
    InvalidArgument,
    /// Declared data length exceeds the largest known parameter.
    #[error("Payload too long: {len} bytes")]
    PayloadTooLong { len: usize },
    /// Fewer bytes than the smallest possible frame (or header).
    #[error("Message too short: {len} bytes")]
    TooShort { len: usize },
    /// First byte is not one of the known command codes.
    #[error("Command {0:#04X} is not valid")]
    InvalidCommand(u8),
    /// A Status frame carries a length byte of zero, which cannot be de-quirked.
    #[error("Invalid length byte in Status header")]
    InvalidLength,
    /// Trailing checksum byte does not match the sum of the preceding bytes.
    #[error("Invalid checksum (calculated: {calculated:#04X}, read: {read:#04X})")]
    ChecksumMismatch { calculated: u8, read: u8 },
    /// Total frame length disagrees with the header.
    #[error("Length mismatch (expected {expected}, got {actual})")]
    LengthMismatch { expected: usize, actual: usize },
    /// Output buffer cannot hold the encoded frame.
    #[error("Buffer too small (needed {needed}, available {available})")]
    BufferTooSmall { needed: usize, available: usize },
}

//==================================================================================CATALOG_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised by catalog lookups.
pub enum CatalogError {
    /// The identifier has no catalog entry, so its length is unknown.
    #[error("Unknown parameter {0}")]
    UnknownParameter(u8),
}

//==================================================================================DECODE_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Failures while turning raw bytes of a known parameter into a typed value.
pub enum DecodeError {
    /// Raw data length differs from the catalog length.
    #[error("Invalid data length for parameter {parameter} (expected {expected}, got {actual})")]
    InvalidDataLength {
        parameter: u8,
        expected: usize,
        actual: usize,
    },
    /// Text field contains non-ASCII bytes.
    #[error("Invalid ASCII text for parameter {parameter}")]
    InvalidText { parameter: u8 },
    /// Calendar fields are out of range.
    #[error("Invalid date for parameter {parameter}")]
    InvalidDate { parameter: u8 },
    /// Record layout read past the raw data.
    #[error(transparent)]
    Reader(#[from] ByteReaderError),
}

//==================================================================================BYTEREADER_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised during cursor reads over raw parameter data.
pub enum ByteReaderError {
    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
}

//==================================================================================CACHE_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Errors raised while storing into a fixed-capacity table.
pub enum CacheError {
    /// No free slot left for a new identifier.
    #[error("Cache partition full, cannot store parameter {parameter}")]
    PartitionFull { parameter: u8 },
    /// Data longer than [`crate::core::MAX_PAYLOAD_LEN`].
    #[error("Payload too long: {len} bytes")]
    PayloadTooLong { len: usize },
}

//==================================================================================EXCHANGE_ERROR
#[derive(Error, Debug)]
/// Outcome of a failed receive on a serial bus.
///
/// Every variant is recoverable: the session resets the port and retries.
pub enum ExchangeError<E: core::fmt::Debug> {
    /// Fewer bytes than required arrived before the deadline.
    #[error("Timeout")]
    Timeout,
    /// Bytes arrived but do not form a valid frame.
    #[error("Invalid data: {0}")]
    InvalidData(FrameError),
    /// A valid frame arrived that does not answer the pending request.
    #[error("Mismatched response")]
    MismatchedResponse,
    /// The underlying port reported an error.
    #[error("Serial port error: {0:?}")]
    Port(E),
}

impl<E: core::fmt::Debug> From<FrameError> for ExchangeError<E> {
    fn from(err: FrameError) -> Self {
        ExchangeError::InvalidData(err)
    }
}
