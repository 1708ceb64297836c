//! Bounds-checked sequential reader over an immutable byte slice.
//!
//! Every read checks `position + n <= len` before touching the buffer and
//! only advances on success, so a failed read leaves the cursor where it was.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DecodeError, Result};

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Move to an absolute position.  Seeking to `len()` is allowed (the
    /// cursor is then exhausted); anything past it is `OutOfBounds`.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return Err(DecodeError::OutOfBounds { offset: pos, wanted: 0, len: self.buf.len() });
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance by `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.checked_end(n)?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    /// Read a u32 without advancing.
    pub fn peek_u32_le(&self) -> Result<u32> {
        let end = self.checked_end(4)?;
        Ok(LittleEndian::read_u32(&self.buf[self.pos..end]))
    }

    fn checked_end(&self, n: usize) -> Result<usize> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.buf.len() => Ok(end),
            _ => Err(DecodeError::OutOfBounds { offset: self.pos, wanted: n, len: self.buf.len() }),
        }
    }
}
