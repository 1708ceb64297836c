//! Recording writer.
//!
//! [`RecordingWriter`] emits an optional container header followed by frame
//! records.  [`FramePayloadBuilder`] assembles one frame payload: the
//! metadata block, then plane bytes back to back in the order they are
//! added.  Nothing here checks that the planes agree with the metadata, so
//! deliberately inconsistent frames can be produced as well.

use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, Write};

use crate::header::ContainerHeader;
use crate::metadata::{FrameMetadata, METADATA_LENGTH};
use crate::record::{FormatRevision, RecordHeader, RECORD_HEADER_SIZE};

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct RecordingWriter<W: Write> {
    writer:             W,
    pub frames_written: usize,
    pub bytes_written:  u64,
}

impl<W: Write> RecordingWriter<W> {
    /// Start a recording with a container header carrying `header_payload`.
    pub fn new(mut writer: W, header_payload: &[u8]) -> io::Result<Self> {
        ContainerHeader::write(&mut writer, header_payload)?;
        Ok(Self {
            writer,
            frames_written: 0,
            bytes_written:  (RECORD_HEADER_SIZE + header_payload.len()) as u64,
        })
    }

    /// Start a recording without a container header.
    pub fn headerless(writer: W) -> Self {
        Self { writer, frames_written: 0, bytes_written: 0 }
    }

    pub fn write_frame(&mut self, revision: FormatRevision, payload: &[u8]) -> io::Result<()> {
        let size = u32::try_from(payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame payload exceeds u32::MAX bytes"))?;
        RecordHeader::frame(revision, size).write(&mut self.writer)?;
        self.writer.write_all(payload)?;
        self.frames_written += 1;
        self.bytes_written += (RECORD_HEADER_SIZE + payload.len()) as u64;
        Ok(())
    }

    /// Write an arbitrary record, e.g. one with a marker readers do not know.
    pub fn write_record(&mut self, marker: u32, payload: &[u8]) -> io::Result<()> {
        RecordHeader { marker, size: payload.len() as u32 }.write(&mut self.writer)?;
        self.writer.write_all(payload)?;
        self.bytes_written += (RECORD_HEADER_SIZE + payload.len()) as u64;
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

// ── Frame payloads ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FramePayloadBuilder {
    metadata: FrameMetadata,
    planes:   Vec<u8>,
}

impl FramePayloadBuilder {
    pub fn new(metadata: FrameMetadata) -> Self {
        Self { metadata, planes: Vec::new() }
    }

    pub fn metadata_mut(&mut self) -> &mut FrameMetadata {
        &mut self.metadata
    }

    pub fn bytes(mut self, raw: &[u8]) -> Self {
        self.planes.extend_from_slice(raw);
        self
    }

    pub fn u16_plane(mut self, samples: &[u16]) -> Self {
        let start = self.planes.len();
        self.planes.resize(start + samples.len() * 2, 0);
        LittleEndian::write_u16_into(samples, &mut self.planes[start..]);
        self
    }

    pub fn u32_plane(mut self, samples: &[u32]) -> Self {
        let start = self.planes.len();
        self.planes.resize(start + samples.len() * 4, 0);
        LittleEndian::write_u32_into(samples, &mut self.planes[start..]);
        self
    }

    /// Interleaved `x, y, z` triplets.
    pub fn i16_plane(mut self, samples: &[i16]) -> Self {
        let start = self.planes.len();
        self.planes.resize(start + samples.len() * 2, 0);
        LittleEndian::write_i16_into(samples, &mut self.planes[start..]);
        self
    }

    pub fn padding(mut self, n: usize) -> Self {
        self.planes.resize(self.planes.len() + n, 0);
        self
    }

    pub fn plane_bytes(&self) -> usize {
        self.planes.len()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(METADATA_LENGTH + self.planes.len());
        // Writing into a Vec cannot fail.
        let _ = self.metadata.write(&mut out);
        out.extend_from_slice(&self.planes);
        out
    }
}
