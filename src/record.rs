use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, Result};

/// Marker of the container header record.  Only valid at file offset 0.
pub const HEADER_MARKER:    u32 = 0xFFFF_FFFF;
/// Frame record, revision 1: an RGB plane, if any, trails the payload.
pub const FRAME_MARKER_V1:  u32 = 0xADF0_0001;
/// Frame record, revision 2: RGB presence is reported in the metadata block.
pub const FRAME_MARKER_V2:  u32 = 0xADF0_0002;
/// `marker` + `size`.
pub const RECORD_HEADER_SIZE: usize = 8;

/// File format revision, identified by a frame record's marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatRevision {
    V1,
    V2,
}

impl FormatRevision {
    pub fn from_marker(marker: u32) -> Option<Self> {
        match marker {
            FRAME_MARKER_V1 => Some(FormatRevision::V1),
            FRAME_MARKER_V2 => Some(FormatRevision::V2),
            _ => None,
        }
    }

    pub fn marker(self) -> u32 {
        match self {
            FormatRevision::V1 => FRAME_MARKER_V1,
            FormatRevision::V2 => FRAME_MARKER_V2,
        }
    }
}

/// The 8-byte `[marker][size]` prefix of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub marker: u32,
    pub size:   u32,
}

impl RecordHeader {
    pub fn frame(revision: FormatRevision, size: u32) -> Self {
        Self { marker: revision.marker(), size }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.marker)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            marker: reader.read_u32::<LittleEndian>()?,
            size:   reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Parse a record header at the cursor.
    ///
    /// A header cut short by end-of-buffer is reported as `CorruptContainer`
    /// and the cursor is left where it was.
    pub fn parse(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let at = cur.position();
        if cur.remaining() < RECORD_HEADER_SIZE {
            return Err(DecodeError::corrupt(
                at,
                format!("truncated record header ({} of {RECORD_HEADER_SIZE} bytes)", cur.remaining()),
            ));
        }
        let marker = cur.read_u32_le()?;
        let size = cur.read_u32_le()?;
        Ok(Self { marker, size })
    }

    pub fn revision(&self) -> Option<FormatRevision> {
        FormatRevision::from_marker(self.marker)
    }
}
