//! Batch decoding over a frame range.
//!
//! # Policy
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | plane or artifact skipped | recorded in the frame's report, run continues |
//! | end of recording | run ends normally |
//! | corrupt record / unreadable metadata | run stops, error kept in the summary |
//!
//! [`decode_each`] streams frames to a sink one at a time so memory stays
//! bounded by a single frame.  [`decode_parallel`] locates every frame
//! first (the walk is inherently sequential), then decodes the located
//! payloads with Rayon when the `parallel` feature is enabled.

use tracing::{info, warn};

use crate::container::{FrameLocation, Recording};
use crate::error::DecodeError;
use crate::frame::{DecodedFrame, FrameDecoder};
use crate::options::FrameRange;

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub index:    usize,
    pub location: FrameLocation,
    pub frame:    DecodedFrame,
}

/// What happened to one frame, without its sample data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    pub index:        usize,
    pub frame_number: u32,
    /// `(plane or artifact, reason)`.
    pub skipped:      Vec<(&'static str, DecodeError)>,
}

impl FrameOutcome {
    fn of(report: &FrameReport) -> Self {
        Self {
            index:        report.index,
            frame_number: report.frame.metadata.frame_number,
            skipped:      report.frame.skipped().into_iter().map(|(n, e)| (n, e.clone())).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<FrameOutcome>,
    /// Structural error that ended the run early.
    pub aborted:  Option<DecodeError>,
}

impl BatchSummary {
    pub fn decoded(&self) -> usize {
        self.outcomes.len()
    }

    pub fn frames_with_skips(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.skipped.is_empty()).count()
    }

    pub fn summary(&self) -> String {
        let tail = match &self.aborted {
            Some(e) => format!("aborted: {e}"),
            None => "completed".to_string(),
        };
        format!(
            "{} frame(s) decoded, {} with skipped planes, {}",
            self.decoded(),
            self.frames_with_skips(),
            tail,
        )
    }
}

/// Decode every frame of `range`, handing each to `sink` in order.
///
/// An error from `sink` stops the run and is returned as is.
pub fn decode_each<F, E>(
    recording: &Recording,
    decoder:   &FrameDecoder,
    range:     FrameRange,
    mut sink:  F,
) -> Result<BatchSummary, E>
where
    F: FnMut(FrameReport) -> Result<(), E>,
{
    let mut summary = BatchSummary::default();
    let degraded = recording.is_degraded();
    if degraded {
        warn!("recording has no container header, decoding in degraded mode");
    }

    for (index, raw) in recording.frames().enumerate() {
        if !range.contains(index) {
            if range.end.is_some_and(|end| index > end) {
                break;
            }
            // Still walked, so corruption before the range is caught.
            if let Err(e) = raw {
                summary.aborted = Some(e);
                break;
            }
            continue;
        }
        let decoded = raw.and_then(|raw| {
            decoder.decode_raw(&raw, degraded).map(|frame| FrameReport { index, location: raw.location, frame })
        });
        match decoded {
            Ok(report) => {
                let outcome = FrameOutcome::of(&report);
                for (what, reason) in &outcome.skipped {
                    warn!(frame = index, what, %reason, "skipped");
                }
                summary.outcomes.push(outcome);
                sink(report)?;
            }
            Err(e) => {
                warn!(frame = index, error = %e, "stopping batch");
                summary.aborted = Some(e);
                break;
            }
        }
    }

    info!("{}", summary.summary());
    Ok(summary)
}

/// Collect every frame of `range` in memory.
pub fn decode_range(
    recording: &Recording,
    decoder:   &FrameDecoder,
    range:     FrameRange,
) -> (Vec<FrameReport>, BatchSummary) {
    let mut frames = Vec::new();
    let summary = decode_each(recording, decoder, range, |r| {
        frames.push(r);
        Ok::<(), std::convert::Infallible>(())
    });
    match summary {
        Ok(s) => (frames, s),
        Err(never) => match never {},
    }
}

/// Locate all frames of `range`, then decode them concurrently.
///
/// Results are in frame order and follow the same policy as
/// [`decode_each`]: frames after a structural failure are dropped.
pub fn decode_parallel(
    recording: &Recording,
    decoder:   &FrameDecoder,
    range:     FrameRange,
) -> (Vec<FrameReport>, BatchSummary) {
    let mut summary = BatchSummary::default();
    let mut located = Vec::new();
    for (index, raw) in recording.frames().enumerate() {
        if range.end.is_some_and(|end| index > end) {
            break;
        }
        match raw {
            Ok(raw) if range.contains(index) => located.push((index, raw)),
            Ok(_) => {}
            Err(e) => {
                summary.aborted = Some(e);
                break;
            }
        }
    }

    let degraded = recording.is_degraded();
    let decode_one = |(index, raw): &(usize, crate::container::RawFrame<'_>)| {
        decoder
            .decode_raw(raw, degraded)
            .map(|frame| FrameReport { index: *index, location: raw.location, frame })
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Result<FrameReport, DecodeError>> = {
        use rayon::prelude::*;
        located.par_iter().map(decode_one).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<FrameReport, DecodeError>> = located.iter().map(decode_one).collect();

    let mut frames = Vec::with_capacity(results.len());
    for r in results {
        match r {
            Ok(report) => {
                summary.outcomes.push(FrameOutcome::of(&report));
                frames.push(report);
            }
            Err(e) => {
                summary.aborted = Some(e);
                break;
            }
        }
    }
    info!("{}", summary.summary());
    (frames, summary)
}
