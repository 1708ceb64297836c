//! Recording container: header detection, frame location, forward iteration.
//!
//! # Layout
//! ```text
//! [0xFFFFFFFF][header_size][header bytes]        optional container header
//! [marker][size][payload ...]                    frame record 0
//! [marker][size][payload ...]                    frame record 1
//! ...
//! ```
//! There is no seek table.  Locating frame N walks N record headers from the
//! first record; [`Frames`] avoids the rescan for sequential access by
//! resuming from the previous record.
//!
//! # Strictness
//! [`locate_frame`] and [`Frames`] are strict: the first record with an
//! unrecognised marker, a truncated header or a size running past the end of
//! the file is `CorruptContainer`.  For a diagnostic walk that keeps going
//! past bad records see [`scanner`].

pub mod scanner;
pub mod writer;

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, Result};
use crate::header::ContainerHeader;
use crate::record::{FormatRevision, RecordHeader};

/// Where one frame's payload lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLocation {
    pub index:          usize,
    /// Absolute offset of the record's `[marker][size]` prefix.
    pub record_offset:  usize,
    pub payload_offset: usize,
    pub payload_length: usize,
    pub revision:       FormatRevision,
}

impl FrameLocation {
    pub fn payload_end(&self) -> usize {
        self.payload_offset + self.payload_length
    }
}

/// Find frame `frame_index` by walking records from `header_offset`.
///
/// Returns the payload range without reading the payload.  Reaching the end
/// of `file` first is `FrameNotFound`.
pub fn locate_frame(file: &[u8], header_offset: usize, frame_index: usize) -> Result<FrameLocation> {
    let mut records = RecordWalk::new(file, header_offset);
    while let Some(loc) = records.next_location()? {
        if loc.index == frame_index {
            return Ok(loc);
        }
    }
    Err(DecodeError::FrameNotFound { index: frame_index, available: records.count })
}

/// Strict sequential walk over frame records.
#[derive(Debug, Clone)]
struct RecordWalk<'a> {
    cursor: ByteCursor<'a>,
    start:  usize,
    count:  usize,
}

impl<'a> RecordWalk<'a> {
    fn new(file: &'a [u8], start: usize) -> Self {
        Self { cursor: ByteCursor::new(file), start, count: 0 }
    }

    /// `Ok(None)` at a clean end of file.
    fn next_location(&mut self) -> Result<Option<FrameLocation>> {
        if self.count == 0 && self.cursor.position() != self.start {
            self.cursor.seek(self.start).map_err(|_| {
                DecodeError::corrupt(self.start, format!("first record offset past end of {}-byte file", self.cursor.len()))
            })?;
        }
        if self.cursor.remaining() == 0 {
            return Ok(None);
        }

        let record_offset = self.cursor.position();
        let header = RecordHeader::parse(&mut self.cursor)?;
        let revision = header.revision().ok_or_else(|| {
            DecodeError::corrupt(record_offset, format!("unexpected record marker {:#010x}", header.marker))
        })?;

        let payload_offset = self.cursor.position();
        let payload_length = header.size as usize;
        if self.cursor.skip(payload_length).is_err() {
            return Err(DecodeError::corrupt(
                record_offset,
                format!("record size {payload_length} exceeds remaining {} bytes", self.cursor.remaining()),
            ));
        }

        let loc = FrameLocation { index: self.count, record_offset, payload_offset, payload_length, revision };
        debug!(index = loc.index, offset = record_offset, size = payload_length, "frame record");
        self.count += 1;
        Ok(Some(loc))
    }
}

// ── Recording ─────────────────────────────────────────────────────────────────

/// A frame's payload bytes together with its location.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub location: FrameLocation,
    pub payload:  &'a [u8],
}

/// Read-only, in-memory view of a recording file.
#[derive(Debug, Clone)]
pub struct Recording {
    path:   Option<PathBuf>,
    data:   Vec<u8>,
    header: ContainerHeader,
}

impl Recording {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let mut rec = Self::from_bytes(data)?;
        rec.path = Some(path.to_owned());
        Ok(rec)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let header = ContainerHeader::detect(&data)?;
        debug!(present = header.present, first_record = header.first_record_offset, "container header");
        Ok(Self { path: None, data, header })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Headerless recordings are decoded in degraded-extraction mode.
    pub fn is_degraded(&self) -> bool {
        !self.header.present
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// O(index): rescans from the first record on every call.
    pub fn locate(&self, index: usize) -> Result<FrameLocation> {
        locate_frame(&self.data, self.header.first_record_offset, index)
    }

    pub fn frame(&self, index: usize) -> Result<RawFrame<'_>> {
        let location = self.locate(index)?;
        Ok(self.raw(location))
    }

    /// Forward iteration; each step resumes where the previous one stopped.
    pub fn frames(&self) -> Frames<'_> {
        Frames { rec: self, walk: RecordWalk::new(&self.data, self.header.first_record_offset), done: false }
    }

    /// Number of frames, failing on the first corrupt record.
    pub fn frame_count(&self) -> Result<usize> {
        let mut n = 0;
        for frame in self.frames() {
            frame?;
            n += 1;
        }
        Ok(n)
    }

    fn raw(&self, location: FrameLocation) -> RawFrame<'_> {
        RawFrame { location, payload: &self.data[location.payload_offset..location.payload_end()] }
    }
}

/// Iterator returned by [`Recording::frames`].  Yields at most one error,
/// after which it is exhausted.
pub struct Frames<'a> {
    rec:  &'a Recording,
    walk: RecordWalk<'a>,
    done: bool,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<RawFrame<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.walk.next_location() {
            Ok(Some(loc)) => Some(Ok(self.rec.raw(loc))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
