use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, Result};
use crate::record::{HEADER_MARKER, RECORD_HEADER_SIZE};

/// Result of probing the first bytes of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// `false` when the file does not start with [`HEADER_MARKER`]; frames
    /// are then decoded in degraded-extraction mode.
    pub present:           bool,
    /// Size of the opaque header payload (0 when absent).
    pub header_size:       u32,
    /// Absolute offset of the first frame record.
    pub first_record_offset: usize,
}

impl ContainerHeader {
    pub fn headerless() -> Self {
        Self { present: false, header_size: 0, first_record_offset: 0 }
    }

    /// Inspect the start of `file`.
    ///
    /// Files shorter than four bytes, or whose first word is not the header
    /// marker, are treated as headerless.  A header marker followed by a
    /// truncated or oversized size field is `CorruptContainer`.
    pub fn detect(file: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::new(file);
        match cur.peek_u32_le() {
            Ok(HEADER_MARKER) => {}
            _ => return Ok(Self::headerless()),
        }
        cur.skip(4)?;
        let header_size = cur
            .read_u32_le()
            .map_err(|_| DecodeError::corrupt(4, "truncated container header size"))?;
        if cur.skip(header_size as usize).is_err() {
            return Err(DecodeError::corrupt(
                RECORD_HEADER_SIZE,
                format!("header size {header_size} exceeds remaining {} bytes", cur.remaining()),
            ));
        }
        Ok(Self {
            present: true,
            header_size,
            first_record_offset: cur.position(),
        })
    }

    /// Write a header record carrying `payload`.
    pub fn write<W: Write>(mut writer: W, payload: &[u8]) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(HEADER_MARKER)?;
        writer.write_u32::<LittleEndian>(payload.len() as u32)?;
        writer.write_all(payload)?;
        Ok(())
    }
}
