//! Stateful little-endian byte cursor.
//!
//! Used by [`crate::elf`] to walk ELF structures and by entry-side ABI
//! consumers to demarshal a packed [`crate::args`] buffer. All reads are
//! little-endian regardless of host byte order.

use crate::error::Error;

/// A read cursor over a borrowed byte slice.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor starting at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Create a cursor starting at `pos` within `bytes`.
    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes remaining to be read.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    /// Read a signed 32-bit little-endian integer, advancing by 4 bytes.
    pub fn read_i32(&mut self) -> Result<i32, Error> {
        let raw = self.take(4)?;
        Ok(i32::from_le_bytes(raw.try_into().expect("length checked above")))
    }

    /// Read a signed 16-bit little-endian integer, advancing by 2 bytes.
    pub fn read_i16(&mut self) -> Result<i16, Error> {
        let raw = self.take(2)?;
        Ok(i16::from_le_bytes(raw.try_into().expect("length checked above")))
    }

    /// Read a single unsigned byte, advancing by 1.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let raw = self.take(1)?;
        Ok(raw[0])
    }

    /// Read an unsigned 32-bit little-endian integer, advancing by 4 bytes.
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes(raw.try_into().expect("length checked above")))
    }

    /// Read an unsigned 16-bit little-endian integer, advancing by 2 bytes.
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let raw = self.take(2)?;
        Ok(u16::from_le_bytes(raw.try_into().expect("length checked above")))
    }

    /// Read an unsigned 64-bit little-endian integer, advancing by 8 bytes.
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let raw = self.take(8)?;
        Ok(u64::from_le_bytes(raw.try_into().expect("length checked above")))
    }

    /// Read a signed 64-bit little-endian integer, advancing by 8 bytes.
    pub fn read_i64(&mut self) -> Result<i64, Error> {
        let raw = self.take(8)?;
        Ok(i64::from_le_bytes(raw.try_into().expect("length checked above")))
    }

    /// Read a `u32` length prefix `L`, then return a borrowed view of the
    /// next `L` bytes, advancing by `L`.
    pub fn read_blob(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}
