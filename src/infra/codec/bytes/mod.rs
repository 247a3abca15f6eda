//! Little-endian cursor over raw parameter data.
//! Parameter records are byte aligned, so a byte cursor is enough to walk
//! their fixed layouts field by field.
use crate::error::ByteReaderError;

/// Reader that extracts little-endian fields from a `&[u8]`
/// without extra allocation or copies.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    /// Index of the next unread byte.
    cursor: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of the provided buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Borrow the next `len` bytes and move past them.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ByteReaderError> {
        let end = self.cursor + len;
        if end > self.buffer.len() {
            return Err(ByteReaderError::OutOfBounds {
                asked: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buffer[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ByteReaderError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ByteReaderError> {
        self.read_array::<1>().map(|b| b[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, ByteReaderError> {
        self.read_array::<1>().map(i8::from_le_bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16, ByteReaderError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, ByteReaderError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, ByteReaderError> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Skip `len` reserved bytes.
    pub fn advance(&mut self, len: usize) -> Result<(), ByteReaderError> {
        self.read_slice(len).map(|_| ())
    }
}
