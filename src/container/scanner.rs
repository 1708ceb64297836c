//! Lenient diagnostic walk over a recording.
//!
//! # How it works
//!
//! Unlike [`locate_frame`](super::locate_frame), the scanner does not stop at
//! the first unrecognised record.  A record whose marker is unknown but whose
//! declared size still fits in the file is logged and skipped; the walk
//! resumes at the next record.  The walk only ends at end of file, at a
//! truncated record header, or at a record whose size runs past the end.
//!
//! ## Record health
//!
//! | Health | Meaning |
//! |--------|---------|
//! | `Healthy` | Known frame marker, payload fully present |
//! | `UnknownMarker` | Marker not a frame marker; payload skipped |
//! | `TruncatedPayload` | Declared size exceeds the bytes left; walk stops |
//! | `TruncatedHeader` | 1..7 trailing bytes; walk stops |
//!
//! ## Progress
//!
//! [`scan_with_progress`] calls back after every record with
//! `(bytes_scanned, total_bytes)`.

use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::header::ContainerHeader;
use crate::record::{FormatRevision, RecordHeader, RECORD_HEADER_SIZE};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordHealth {
    Healthy { revision: FormatRevision },
    UnknownMarker { marker: u32 },
    TruncatedPayload { declared: u32, available: usize },
    TruncatedHeader { available: usize },
}

impl RecordHealth {
    pub fn is_frame(&self) -> bool {
        matches!(self, RecordHealth::Healthy { .. })
    }
}

/// Diagnostic entry for one record position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    pub offset: usize,
    /// `None` when the header itself was truncated.
    pub size:   Option<u32>,
    pub health: RecordHealth,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub header:           ContainerHeader,
    pub file_size:        usize,
    pub total_records:    usize,
    pub frame_records:    usize,
    pub unknown_records:  usize,
    /// Whether the walk ended on a truncated header or payload.
    pub truncated:        bool,
    pub bytes_scanned:    usize,
    pub v1_frames:        usize,
    pub v2_frames:        usize,
    pub record_log:       Vec<ScannedRecord>,
}

impl ScanReport {
    /// No unknown records and no truncation.
    pub fn is_clean(&self) -> bool {
        self.unknown_records == 0 && !self.truncated
    }

    /// Offsets of the usable frame records, in file order.
    pub fn frame_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.record_log.iter().filter(|r| r.health.is_frame()).map(|r| r.offset)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} frame(s) in {} record(s) ({} v1, {} v2), {} unknown, {}, \
             {}/{} bytes walked, header {}",
            self.frame_records,
            self.total_records,
            self.v1_frames,
            self.v2_frames,
            self.unknown_records,
            if self.truncated { "truncated" } else { "complete" },
            self.bytes_scanned,
            self.file_size,
            if self.header.present { "present" } else { "absent (degraded)" },
        )
    }
}

// ── Scanner ───────────────────────────────────────────────────────────────────

/// Walk every record in `file`.
///
/// Only a corrupt container header is an error; everything after it is
/// encoded in the report.
pub fn scan(file: &[u8]) -> Result<ScanReport> {
    scan_with_progress::<fn(usize, usize)>(file, None)
}

pub fn scan_with_progress<F>(file: &[u8], mut progress: Option<&mut F>) -> Result<ScanReport>
where
    F: FnMut(usize, usize),
{
    let header = ContainerHeader::detect(file)?;
    let mut cur = ByteCursor::new(file);
    cur.seek(header.first_record_offset)?;

    let mut report = ScanReport {
        header,
        file_size:       file.len(),
        total_records:   0,
        frame_records:   0,
        unknown_records: 0,
        truncated:       false,
        bytes_scanned:   header.first_record_offset,
        v1_frames:       0,
        v2_frames:       0,
        record_log:      Vec::new(),
    };

    while cur.remaining() > 0 {
        let offset = cur.position();
        report.total_records += 1;

        if cur.remaining() < RECORD_HEADER_SIZE {
            report.truncated = true;
            report.record_log.push(ScannedRecord {
                offset,
                size:   None,
                health: RecordHealth::TruncatedHeader { available: cur.remaining() },
            });
            break;
        }

        let rec = RecordHeader::parse(&mut cur)?;
        let available = cur.remaining();
        let health = if rec.size as usize > available {
            report.truncated = true;
            RecordHealth::TruncatedPayload { declared: rec.size, available }
        } else {
            match rec.revision() {
                Some(revision) => {
                    report.frame_records += 1;
                    match revision {
                        FormatRevision::V1 => report.v1_frames += 1,
                        FormatRevision::V2 => report.v2_frames += 1,
                    }
                    RecordHealth::Healthy { revision }
                }
                None => {
                    report.unknown_records += 1;
                    RecordHealth::UnknownMarker { marker: rec.marker }
                }
            }
        };
        let stop = matches!(health, RecordHealth::TruncatedPayload { .. });
        report.record_log.push(ScannedRecord { offset, size: Some(rec.size), health });
        if stop {
            break;
        }

        cur.skip(rec.size as usize)?;
        report.bytes_scanned = cur.position();

        if let Some(ref mut cb) = progress {
            cb(report.bytes_scanned, file.len());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FRAME_MARKER_V1, FRAME_MARKER_V2, HEADER_MARKER};

    fn record(buf: &mut Vec<u8>, marker: u32, size: usize) {
        buf.extend_from_slice(&marker.to_le_bytes());
        buf.extend_from_slice(&(size as u32).to_le_bytes());
        buf.extend(std::iter::repeat(0xAB).take(size));
    }

    #[test]
    fn clean_file() {
        let mut file = Vec::new();
        record(&mut file, HEADER_MARKER, 4);
        record(&mut file, FRAME_MARKER_V1, 10);
        record(&mut file, FRAME_MARKER_V2, 20);
        let report = scan(&file).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.frame_records, 2);
        assert_eq!((report.v1_frames, report.v2_frames), (1, 1));
        assert_eq!(report.bytes_scanned, file.len());
        assert_eq!(report.frame_offsets().collect::<Vec<_>>(), vec![12, 30]);
    }

    #[test]
    fn unknown_records_are_skipped() {
        let mut file = Vec::new();
        record(&mut file, FRAME_MARKER_V1, 3);
        record(&mut file, 0x1234_5678, 5);
        record(&mut file, FRAME_MARKER_V1, 3);
        let report = scan(&file).unwrap();
        assert!(!report.header.present);
        assert_eq!(report.total_records, 3);
        assert_eq!(report.frame_records, 2);
        assert_eq!(report.unknown_records, 1);
        assert_eq!(report.record_log[1].health, RecordHealth::UnknownMarker { marker: 0x1234_5678 });
        assert!(!report.is_clean());
    }

    #[test]
    fn truncation_ends_the_walk() {
        let mut file = Vec::new();
        record(&mut file, FRAME_MARKER_V1, 3);
        file.extend_from_slice(&[1, 2, 3]);
        let report = scan(&file).unwrap();
        assert!(report.truncated);
        assert_eq!(report.record_log[1].health, RecordHealth::TruncatedHeader { available: 3 });

        let mut file = Vec::new();
        record(&mut file, FRAME_MARKER_V2, 30);
        file.truncate(20);
        let report = scan(&file).unwrap();
        assert_eq!(report.frame_records, 0);
        assert_eq!(
            report.record_log[0].health,
            RecordHealth::TruncatedPayload { declared: 30, available: 12 }
        );
    }

    #[test]
    fn progress_is_reported_per_record() {
        let mut file = Vec::new();
        record(&mut file, FRAME_MARKER_V1, 2);
        record(&mut file, FRAME_MARKER_V1, 2);
        let mut calls = Vec::new();
        let mut cb = |done: usize, total: usize| calls.push((done, total));
        scan_with_progress(&file, Some(&mut cb)).unwrap();
        assert_eq!(calls, vec![(10, 20), (20, 20)]);
    }

    #[test]
    fn empty_file() {
        let report = scan(&[]).unwrap();
        assert_eq!(report.total_records, 0);
        assert!(report.is_clean());
    }
}
