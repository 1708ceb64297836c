//! Whole-frame decoding.
//!
//! A frame payload is the 128-byte metadata block followed by the plane
//! data region.  [`FrameDecoder::decode`] parses the metadata, resolves the
//! layout, decodes every placed plane and derives the RGB image and point
//! cloud.  Only a payload too short for the metadata block fails the call;
//! everything else lands in a per-plane [`PlaneStatus`].
//!
//! Frames coming from a live capture session are already split into named
//! planes.  [`FrameDecoder::decode_live`] takes them through the same plane
//! decoders without any offset arithmetic.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::color::{self, RgbImage};
use crate::container::{RawFrame, Recording};
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, Result};
use crate::layout::{
    self, ConfidencePacking, LayoutVariant, PlaneDescriptor, PlaneKind, ResolvedLayout, RgbConvention,
};
use crate::metadata::FrameMetadata;
use crate::options::DecodeOptions;
use crate::plane::{self, DecodedPlane};
use crate::pointcloud::{self, PointCloud};
use crate::record::FormatRevision;

/// Outcome for one plane or derived artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneStatus {
    Decoded,
    /// Not part of this frame's layout, or not requested.
    Absent,
    Skipped(DecodeError),
}

impl PlaneStatus {
    pub fn is_decoded(&self) -> bool {
        matches!(self, PlaneStatus::Decoded)
    }

    pub fn reason(&self) -> Option<&DecodeError> {
        match self {
            PlaneStatus::Skipped(e) => Some(e),
            _ => None,
        }
    }
}

static ABSENT: PlaneStatus = PlaneStatus::Absent;

#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub metadata:           FrameMetadata,
    /// `None` for live frames.
    pub revision:           Option<FormatRevision>,
    /// Decoded from a headerless recording.
    pub degraded:           bool,
    /// `None` for live frames.
    pub layout:             Option<ResolvedLayout>,
    pub planes:             BTreeMap<PlaneKind, DecodedPlane>,
    /// One entry per [`PlaneKind`].
    pub status:             BTreeMap<PlaneKind, PlaneStatus>,
    pub rgb:                Option<RgbImage>,
    pub rgb_status:         PlaneStatus,
    pub point_cloud:        Option<PointCloud>,
    pub point_cloud_status: PlaneStatus,
}

impl DecodedFrame {
    pub fn plane(&self, kind: PlaneKind) -> Option<&DecodedPlane> {
        self.planes.get(&kind)
    }

    pub fn status(&self, kind: PlaneKind) -> &PlaneStatus {
        self.status.get(&kind).unwrap_or(&ABSENT)
    }

    /// Planes and artifacts that were skipped, with their reasons.
    pub fn skipped(&self) -> Vec<(&'static str, &DecodeError)> {
        let planes = self.status.iter().filter_map(|(k, s)| s.reason().map(|e| (k.name(), e)));
        let artifacts = [("rgb image", &self.rgb_status), ("point cloud", &self.point_cloud_status)]
            .into_iter()
            .filter_map(|(name, s)| s.reason().map(|e| (name, e)));
        planes.chain(artifacts).collect()
    }

    /// Nothing was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped().is_empty()
    }
}

/// Named-plane access to a frame delivered by a capture session.
pub trait LiveFrame {
    fn plane(&self, kind: PlaneKind) -> Option<&[u8]>;
    fn metadata(&self) -> &FrameMetadata;
}

/// [`LiveFrame`] backed by owned buffers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLiveFrame {
    metadata: FrameMetadata,
    planes:   BTreeMap<PlaneKind, Vec<u8>>,
}

impl InMemoryLiveFrame {
    pub fn new(metadata: FrameMetadata) -> Self {
        Self { metadata, planes: BTreeMap::new() }
    }

    pub fn with_plane(mut self, kind: PlaneKind, bytes: Vec<u8>) -> Self {
        self.planes.insert(kind, bytes);
        self
    }
}

impl LiveFrame for InMemoryLiveFrame {
    fn plane(&self, kind: PlaneKind) -> Option<&[u8]> {
        self.planes.get(&kind).map(Vec::as_slice)
    }

    fn metadata(&self) -> &FrameMetadata {
        &self.metadata
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    options: DecodeOptions,
}

impl FrameDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode frame `index` of `recording`.
    pub fn decode_at(&self, recording: &Recording, index: usize) -> Result<DecodedFrame> {
        let raw = recording.frame(index)?;
        self.decode_raw(&raw, recording.is_degraded())
    }

    pub fn decode_raw(&self, raw: &RawFrame<'_>, degraded: bool) -> Result<DecodedFrame> {
        self.decode(raw.payload, raw.location.revision, degraded)
    }

    /// Decode one frame payload.
    ///
    /// Fails only when the payload cannot hold the metadata block.
    pub fn decode(&self, payload: &[u8], revision: FormatRevision, degraded: bool) -> Result<DecodedFrame> {
        let mut cur = ByteCursor::new(payload);
        let mut metadata = FrameMetadata::parse(&mut cur)?;
        let region = &payload[cur.position()..];

        if degraded && !metadata.has_dimensions() {
            if let Some((w, h)) = self.options.fallback_dimensions {
                warn!(frame = metadata.frame_number, width = w, height = h, "headerless recording, using fallback dimensions");
                metadata.width = w;
                metadata.height = h;
            }
        }

        let variant = self.options.layout.apply(LayoutVariant::defaults(&metadata, revision));
        let mut resolved = layout::resolve(&metadata, variant, region.len());
        if !metadata.has_dimensions() {
            warn!(frame = metadata.frame_number, degraded, "frame reports zero dimensions");
            for entry in &mut resolved.entries {
                let depends_on_tof = entry.kind != PlaneKind::Rgb || variant.rgb == RgbConvention::Reported;
                if depends_on_tof {
                    entry.placement = Err(DecodeError::MissingDimensions { plane: entry.kind });
                }
            }
        }

        let mut planes = BTreeMap::new();
        let mut status: BTreeMap<PlaneKind, PlaneStatus> =
            PlaneKind::ALL.into_iter().map(|k| (k, PlaneStatus::Absent)).collect();

        for entry in &resolved.entries {
            let outcome = entry.placement.clone().and_then(|desc| plane::decode(region, &desc));
            status.insert(entry.kind, self.record(entry.kind, outcome, &mut planes));
        }

        let mut frame = DecodedFrame {
            metadata,
            revision: Some(revision),
            degraded,
            layout: Some(resolved),
            planes,
            status,
            rgb: None,
            rgb_status: PlaneStatus::Absent,
            point_cloud: None,
            point_cloud_status: PlaneStatus::Absent,
        };
        self.derive(&mut frame);
        Ok(frame)
    }

    /// Decode a frame whose planes arrive already demultiplexed.
    pub fn decode_live<F: LiveFrame + ?Sized>(&self, live: &F) -> DecodedFrame {
        let metadata = live.metadata().clone();
        let packing = self
            .options
            .layout
            .confidence
            .unwrap_or_else(|| ConfidencePacking::for_class(metadata.sensor_class()));
        let mut planes = BTreeMap::new();
        let mut status = BTreeMap::new();

        for kind in PlaneKind::ALL {
            let st = match live.plane(kind) {
                None => PlaneStatus::Absent,
                Some(bytes) => {
                    let desc = live_descriptor(&metadata, kind, packing, bytes.len());
                    self.record(kind, plane::decode(bytes, &desc), &mut planes)
                }
            };
            status.insert(kind, st);
        }

        let mut frame = DecodedFrame {
            metadata,
            revision: None,
            degraded: false,
            layout: None,
            planes,
            status,
            rgb: None,
            rgb_status: PlaneStatus::Absent,
            point_cloud: None,
            point_cloud_status: PlaneStatus::Absent,
        };
        self.derive(&mut frame);
        frame
    }

    fn record(
        &self,
        kind: PlaneKind,
        outcome: Result<DecodedPlane>,
        planes: &mut BTreeMap<PlaneKind, DecodedPlane>,
    ) -> PlaneStatus {
        match outcome {
            Ok(p) => {
                debug!(plane = %kind, width = p.width, height = p.height, samples = p.data.len(), "plane decoded");
                planes.insert(kind, p);
                PlaneStatus::Decoded
            }
            Err(e) => {
                warn!(plane = %kind, reason = %e, "plane skipped");
                PlaneStatus::Skipped(e)
            }
        }
    }

    /// RGB image and point cloud from the decoded planes.
    fn derive(&self, frame: &mut DecodedFrame) {
        if self.options.convert_rgb {
            if let Some(p) = frame.planes.get(&PlaneKind::Rgb) {
                let nv12 = p.as_u8().unwrap_or_default();
                match color::nv12_to_rgb(nv12, p.width, p.height) {
                    Ok(img) => {
                        frame.rgb = Some(img);
                        frame.rgb_status = PlaneStatus::Decoded;
                    }
                    Err(e) => {
                        warn!(reason = %e, "rgb conversion skipped");
                        frame.rgb_status = PlaneStatus::Skipped(e);
                    }
                }
            }
        }

        if self.options.point_cloud {
            if let Some(p) = frame.planes.get(&PlaneKind::Xyz) {
                let xyz = p.as_i16().unwrap_or_default();
                match pointcloud::build(xyz, p.width, p.height) {
                    Ok(cloud) => {
                        debug!(points = cloud.len(), invalid = cloud.invalid, "point cloud built");
                        frame.point_cloud = Some(cloud);
                        frame.point_cloud_status = PlaneStatus::Decoded;
                    }
                    Err(e) => {
                        warn!(reason = %e, "point cloud skipped");
                        frame.point_cloud_status = PlaneStatus::Skipped(e);
                    }
                }
            }
        }
    }
}

/// Shape for a named live plane.  The whole buffer is the plane; the
/// decoders check it against the shape.
fn live_descriptor(
    metadata: &FrameMetadata,
    kind: PlaneKind,
    packing: ConfidencePacking,
    len: usize,
) -> PlaneDescriptor {
    let (w, h) = match kind {
        PlaneKind::Rgb => {
            let (w, h) = metadata.rgb_dimensions();
            (w as usize, h as usize)
        }
        _ => (metadata.width as usize, metadata.height as usize),
    };
    let (bytes_per_sample, channels) = match kind {
        PlaneKind::Depth | PlaneKind::Ab => (2, 1),
        PlaneKind::Confidence => (packing.bytes_per_pixel(), 1),
        PlaneKind::Xyz => (2, 3),
        PlaneKind::Rgb => (1, 1),
    };
    PlaneDescriptor { kind, byte_offset: 0, byte_length: len, width: w, height: h, bytes_per_sample, channels }
}
