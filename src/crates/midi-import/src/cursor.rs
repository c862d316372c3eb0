//! Bounds-checked big-endian reader over an SMF byte buffer

use crate::error::{ImportError, Result};

/// Longest VLQ the SMF format allows (28 bits of payload)
pub const MAX_VLQ_BYTES: usize = 4;

/// Largest value a four-byte VLQ can carry
pub const MAX_VLQ_VALUE: u32 = 0x0FFF_FFFF;

/// A read position over a borrowed byte slice.
///
/// Every read advances the position and fails with [`ImportError::Truncated`]
/// instead of reading past the end. Offsets in errors are absolute within the
/// whole file, including for cursors created with [`ByteCursor::split`].
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Cursor positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut cursor = Self::new(data);
        cursor.skip(offset)?;
        Ok(cursor)
    }

    /// Position relative to the start of this cursor's slice
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position within the whole file
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(ImportError::Truncated {
                offset: self.absolute_position(),
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn peek_u8(&self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.data[self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(3)?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read an SMF variable-length quantity.
    ///
    /// Each byte contributes its low seven bits, most significant first, and
    /// the top bit marks continuation. A fifth byte is never read.
    pub fn read_vlq(&mut self) -> Result<u32> {
        let start = self.absolute_position();
        let mut value: u32 = 0;
        for _ in 0..MAX_VLQ_BYTES {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ImportError::MalformedVlq { offset: start })
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Consume the next `len` bytes and return a cursor limited to them
    pub fn split(&mut self, len: usize) -> Result<ByteCursor<'a>> {
        let base = self.absolute_position();
        let data = self.read_bytes(len)?;
        Ok(ByteCursor { data, pos: 0, base })
    }
}

/// Decode the VLQ at `offset`, returning the value and the number of bytes it used
pub fn read_vlq(buffer: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut cursor = ByteCursor::at(buffer, offset)?;
    let value = cursor.read_vlq()?;
    Ok((value, cursor.position() - offset))
}
