//! Plane layout resolution.
//!
//! A frame's plane data region is a concatenation of fixed-size planes whose
//! presence and packing depend on the imager mode and on the file format
//! revision.  Nothing here inspects plane contents: placement is a pure
//! function of the metadata block, an explicit [`LayoutVariant`] and the
//! length of the region.
//!
//! ```text
//! 0          w*h*2        w*h*4                              tof_end      len
//! | depth    | AB         | confidence? | XYZ?               | ...  | RGB? |
//! ```
//!
//! ToF planes are packed back to back from offset 0.  Where the RGB plane
//! lives is format-revision specific (see [`RgbConvention`]).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeError;
use crate::metadata::{FrameMetadata, SensorClass};
use crate::record::FormatRevision;

// ── Plane identity ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneKind {
    Depth,
    Ab,
    Confidence,
    Xyz,
    Rgb,
}

impl PlaneKind {
    pub const ALL: [PlaneKind; 5] =
        [PlaneKind::Depth, PlaneKind::Ab, PlaneKind::Confidence, PlaneKind::Xyz, PlaneKind::Rgb];

    /// Short name used by the capture SDK and in exported file names.
    pub fn name(self) -> &'static str {
        match self {
            PlaneKind::Depth      => "depth",
            PlaneKind::Ab         => "ab",
            PlaneKind::Confidence => "conf",
            PlaneKind::Xyz        => "xyz",
            PlaneKind::Rgb        => "rgb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PlaneKind::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for PlaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Layout variants ───────────────────────────────────────────────────────────

/// Which ToF planes a frame carries besides depth and AB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputConfiguration {
    DepthAb,
    DepthAbConfidence,
    DepthAbXyz,
    DepthAbConfidenceXyz,
}

impl OutputConfiguration {
    /// Set named by the metadata output configuration code; `0` and unknown
    /// codes are not a report.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(OutputConfiguration::DepthAb),
            2 => Some(OutputConfiguration::DepthAbConfidence),
            3 => Some(OutputConfiguration::DepthAbXyz),
            4 => Some(OutputConfiguration::DepthAbConfidenceXyz),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            OutputConfiguration::DepthAb              => 1,
            OutputConfiguration::DepthAbConfidence    => 2,
            OutputConfiguration::DepthAbXyz           => 3,
            OutputConfiguration::DepthAbConfidenceXyz => 4,
        }
    }

    pub fn from_planes(confidence: bool, xyz: bool) -> Self {
        match (confidence, xyz) {
            (false, false) => OutputConfiguration::DepthAb,
            (true, false)  => OutputConfiguration::DepthAbConfidence,
            (false, true)  => OutputConfiguration::DepthAbXyz,
            (true, true)   => OutputConfiguration::DepthAbConfidenceXyz,
        }
    }

    /// The reported code when there is one, otherwise the XYZ flag plus the
    /// sensor class (only QMP modes carry confidence).
    pub fn for_frame(metadata: &FrameMetadata) -> Self {
        Self::from_code(metadata.output_configuration).unwrap_or_else(|| {
            let confidence = metadata.sensor_class() == SensorClass::QuarterMegapixel;
            Self::from_planes(confidence, metadata.xyz_enabled)
        })
    }

    pub fn has_confidence(self) -> bool {
        matches!(self, OutputConfiguration::DepthAbConfidence | OutputConfiguration::DepthAbConfidenceXyz)
    }

    pub fn has_xyz(self) -> bool {
        matches!(self, OutputConfiguration::DepthAbXyz | OutputConfiguration::DepthAbConfidenceXyz)
    }
}

/// Where the NV12 colour plane is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RgbConvention {
    /// Last `nv12_len` bytes of the region, present whenever the region is
    /// longer than the ToF planes.
    Trailing,
    /// Present iff the metadata RGB flag is set; starts right after the ToF
    /// planes with the dimensions the metadata reports.
    Reported,
}

impl RgbConvention {
    pub fn for_revision(revision: FormatRevision) -> Self {
        match revision {
            FormatRevision::V1 => RgbConvention::Trailing,
            FormatRevision::V2 => RgbConvention::Reported,
        }
    }
}

/// On-disk packing of the confidence plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidencePacking {
    /// One little-endian u32 per pixel.
    Direct32,
    /// 32-bit words re-split into sequential 16-bit halves, one per pixel.
    SplitHalves,
}

impl ConfidencePacking {
    pub fn for_class(class: SensorClass) -> Self {
        match class {
            SensorClass::Megapixel => ConfidencePacking::Direct32,
            SensorClass::QuarterMegapixel | SensorClass::Other => ConfidencePacking::SplitHalves,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ConfidencePacking::Direct32    => 4,
            ConfidencePacking::SplitHalves => 2,
        }
    }
}

/// Fully resolved layout choice for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutVariant {
    pub output:     OutputConfiguration,
    pub rgb:        RgbConvention,
    pub confidence: ConfidencePacking,
}

impl LayoutVariant {
    /// Defaults: the output set follows the frame's metadata, confidence
    /// packing the sensor class, the RGB convention the record's format
    /// revision.
    pub fn defaults(metadata: &FrameMetadata, revision: FormatRevision) -> Self {
        Self {
            output:     OutputConfiguration::for_frame(metadata),
            rgb:        RgbConvention::for_revision(revision),
            confidence: ConfidencePacking::for_class(metadata.sensor_class()),
        }
    }
}

/// Caller overrides; `None` keeps the default for that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOverrides {
    pub output:     Option<OutputConfiguration>,
    pub rgb:        Option<RgbConvention>,
    pub confidence: Option<ConfidencePacking>,
}

impl LayoutOverrides {
    pub fn apply(&self, defaults: LayoutVariant) -> LayoutVariant {
        LayoutVariant {
            output:     self.output.unwrap_or(defaults.output),
            rgb:        self.rgb.unwrap_or(defaults.rgb),
            confidence: self.confidence.unwrap_or(defaults.confidence),
        }
    }
}

// ── Descriptors ───────────────────────────────────────────────────────────────

/// Location and shape of one plane inside the plane data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneDescriptor {
    pub kind:             PlaneKind,
    pub byte_offset:      usize,
    pub byte_length:      usize,
    pub width:            usize,
    pub height:           usize,
    pub bytes_per_sample: usize,
    pub channels:         usize,
}

impl PlaneDescriptor {
    pub fn end(&self) -> usize {
        self.byte_offset + self.byte_length
    }
}

/// Size of an NV12 buffer: full-resolution luma plus one interleaved UV
/// pair per 2×2 block (odd dimensions round up).
pub fn nv12_len(width: usize, height: usize) -> usize {
    width * height + 2 * width.div_ceil(2) * height.div_ceil(2)
}

/// One plane's placement, or why it could not be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    pub kind:      PlaneKind,
    pub placement: Result<PlaneDescriptor, DecodeError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    pub variant:       LayoutVariant,
    pub entries:       Vec<LayoutEntry>,
    /// End of the last ToF plane.
    pub tof_end:       usize,
    pub region_length: usize,
}

impl ResolvedLayout {
    /// Descriptors that fit inside the region, in layout order.
    pub fn descriptors(&self) -> impl Iterator<Item = &PlaneDescriptor> {
        self.entries.iter().filter_map(|e| e.placement.as_ref().ok())
    }

    pub fn entry(&self, kind: PlaneKind) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn descriptor(&self, kind: PlaneKind) -> Option<&PlaneDescriptor> {
        self.entry(kind).and_then(|e| e.placement.as_ref().ok())
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Compute plane placement for a region of `region_length` bytes.
///
/// Planes that would run past the region are reported as
/// `PlaneLayoutMismatch` in their entry; other planes are unaffected.
/// Planes the variant does not include get no entry at all.
pub fn resolve(metadata: &FrameMetadata, variant: LayoutVariant, region_length: usize) -> ResolvedLayout {
    let w = metadata.width as usize;
    let h = metadata.height as usize;
    let pixels = w * h;

    let mut entries = Vec::with_capacity(5);
    let mut offset = 0usize;

    let mut place = |kind: PlaneKind, bytes_per_sample: usize, channels: usize, offset: &mut usize| {
        let desc = PlaneDescriptor {
            kind,
            byte_offset: *offset,
            byte_length: pixels * bytes_per_sample * channels,
            width: w,
            height: h,
            bytes_per_sample,
            channels,
        };
        *offset = desc.end();
        entries.push(LayoutEntry { kind, placement: check(desc, region_length) });
    };

    place(PlaneKind::Depth, 2, 1, &mut offset);
    place(PlaneKind::Ab, 2, 1, &mut offset);
    if variant.output.has_confidence() {
        place(PlaneKind::Confidence, variant.confidence.bytes_per_pixel(), 1, &mut offset);
    }
    if variant.output.has_xyz() {
        place(PlaneKind::Xyz, 2, 3, &mut offset);
    }
    let tof_end = offset;

    let (rw, rh) = metadata.rgb_dimensions();
    let (rw, rh) = (rw as usize, rh as usize);
    let rgb_len = nv12_len(rw, rh);
    let rgb = |byte_offset: usize| PlaneDescriptor {
        kind: PlaneKind::Rgb,
        byte_offset,
        byte_length: rgb_len,
        width: rw,
        height: rh,
        bytes_per_sample: 1,
        channels: 1,
    };

    match variant.rgb {
        RgbConvention::Trailing if region_length > tof_end => {
            let placement = if region_length - tof_end >= rgb_len {
                Ok(rgb(region_length - rgb_len))
            } else {
                Err(DecodeError::PlaneLayoutMismatch {
                    plane:     PlaneKind::Rgb,
                    end:       tof_end + rgb_len,
                    available: region_length,
                })
            };
            entries.push(LayoutEntry { kind: PlaneKind::Rgb, placement });
        }
        RgbConvention::Reported if metadata.rgb_enabled => {
            entries.push(LayoutEntry { kind: PlaneKind::Rgb, placement: check(rgb(tof_end), region_length) });
        }
        _ => {}
    }

    ResolvedLayout { variant, entries, tof_end, region_length }
}

fn check(desc: PlaneDescriptor, region_length: usize) -> Result<PlaneDescriptor, DecodeError> {
    if desc.end() <= region_length {
        Ok(desc)
    } else {
        Err(DecodeError::PlaneLayoutMismatch {
            plane:     desc.kind,
            end:       desc.end(),
            available: region_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(width: u16, height: u16) -> FrameMetadata {
        FrameMetadata { width, height, ..Default::default() }
    }

    fn assert_disjoint(layout: &ResolvedLayout) {
        let mut ranges: Vec<(usize, usize)> =
            layout.descriptors().map(|d| (d.byte_offset, d.end())).collect();
        ranges.sort();
        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlap: {:?}", pair);
        }
        let total: usize = layout.descriptors().map(|d| d.byte_length).sum();
        assert!(total <= layout.region_length);
    }

    #[test]
    fn megapixel_mode_zero_has_depth_and_ab_only() {
        let m = md(1024, 1024);
        let plane = 1024 * 1024 * 2;
        let variant = LayoutVariant::defaults(&m, FormatRevision::V1);
        let layout = resolve(&m, variant, 2 * plane);

        assert_eq!(layout.entries.len(), 2);
        let depth = layout.descriptor(PlaneKind::Depth).unwrap();
        let ab = layout.descriptor(PlaneKind::Ab).unwrap();
        assert_eq!((depth.byte_offset, depth.byte_length), (0, plane));
        assert_eq!((ab.byte_offset, ab.byte_length), (plane, plane));
    }

    #[test]
    fn quarter_megapixel_planes_do_not_overlap() {
        let m = FrameMetadata { xyz_enabled: true, ..md(512, 512) };
        let variant = LayoutVariant::defaults(&m, FormatRevision::V1);
        assert_eq!(variant.output, OutputConfiguration::DepthAbConfidenceXyz);
        assert_eq!(variant.confidence, ConfidencePacking::SplitHalves);

        let px = 512 * 512;
        let region = px * 2 + px * 2 + px * 2 + px * 6;
        let layout = resolve(&m, variant, region);

        assert_eq!(layout.descriptors().count(), 4);
        assert_eq!(layout.descriptor(PlaneKind::Confidence).unwrap().byte_offset, px * 4);
        assert_eq!(layout.descriptor(PlaneKind::Xyz).unwrap().byte_offset, px * 6);
        assert_eq!(layout.tof_end, region);
        assert_disjoint(&layout);
    }

    #[test]
    fn xyz_follows_ab_when_confidence_absent() {
        let m = md(4, 2);
        let variant = LayoutVariant {
            output:     OutputConfiguration::DepthAbXyz,
            rgb:        RgbConvention::Reported,
            confidence: ConfidencePacking::Direct32,
        };
        let layout = resolve(&m, variant, 1000);
        let xyz = layout.descriptor(PlaneKind::Xyz).unwrap();
        assert_eq!(xyz.byte_offset, 8 * 4);
        assert_eq!(xyz.byte_length, 8 * 6);
        assert!(layout.entry(PlaneKind::Confidence).is_none());
    }

    #[test]
    fn trailing_rgb_sits_at_end_of_region() {
        let m = md(2, 2);
        let variant = LayoutVariant::defaults(&m, FormatRevision::V1);
        let rgb_len = nv12_len(1920, 1200);
        assert_eq!(rgb_len, 1920 * 1200 * 3 / 2);

        let region = 16 + 4 + rgb_len;
        let layout = resolve(&m, variant, region);
        let rgb = layout.descriptor(PlaneKind::Rgb).unwrap();
        assert_eq!(rgb.byte_offset, region - rgb_len);
        assert_eq!((rgb.width, rgb.height), (1920, 1200));
        assert_disjoint(&layout);
    }

    #[test]
    fn trailing_rgb_too_short_is_a_plane_mismatch() {
        let m = md(2, 2);
        let variant = LayoutVariant::defaults(&m, FormatRevision::V1);
        let layout = resolve(&m, variant, 16 + 100);
        let entry = layout.entry(PlaneKind::Rgb).unwrap();
        assert!(matches!(
            entry.placement,
            Err(DecodeError::PlaneLayoutMismatch { plane: PlaneKind::Rgb, .. })
        ));
        assert!(layout.descriptor(PlaneKind::Depth).is_some());
        assert!(layout.descriptor(PlaneKind::Ab).is_some());
    }

    #[test]
    fn reported_rgb_follows_flag_not_size() {
        let mut m = md(2, 2);
        m.rgb_width = 4;
        m.rgb_height = 2;
        let variant = LayoutVariant::defaults(&m, FormatRevision::V2);

        let layout = resolve(&m, variant, 16 + 12 + 50);
        assert!(layout.entry(PlaneKind::Rgb).is_none());

        m.rgb_enabled = true;
        let layout = resolve(&m, variant, 16 + 12);
        let rgb = layout.descriptor(PlaneKind::Rgb).unwrap();
        assert_eq!((rgb.byte_offset, rgb.byte_length), (16, 12));
    }

    #[test]
    fn short_region_only_fails_planes_past_the_end() {
        let m = md(2, 2);
        let variant = LayoutVariant::defaults(&m, FormatRevision::V2);
        let layout = resolve(&m, variant, 10);
        assert!(layout.descriptor(PlaneKind::Depth).is_some());
        assert_eq!(
            layout.entry(PlaneKind::Ab).unwrap().placement,
            Err(DecodeError::PlaneLayoutMismatch { plane: PlaneKind::Ab, end: 16, available: 10 })
        );
    }

    #[test]
    fn output_set_follows_metadata_flags_and_code() {
        let qmp = md(512, 1);
        assert_eq!(OutputConfiguration::for_frame(&qmp), OutputConfiguration::DepthAbConfidence);
        let qmp_xyz = FrameMetadata { xyz_enabled: true, ..qmp.clone() };
        assert_eq!(OutputConfiguration::for_frame(&qmp_xyz), OutputConfiguration::DepthAbConfidenceXyz);
        let mp_xyz = FrameMetadata { xyz_enabled: true, ..md(1024, 1) };
        assert_eq!(OutputConfiguration::for_frame(&mp_xyz), OutputConfiguration::DepthAbXyz);

        let coded = FrameMetadata { output_configuration: 1, ..qmp_xyz };
        assert_eq!(OutputConfiguration::for_frame(&coded), OutputConfiguration::DepthAb);
        for output in [
            OutputConfiguration::DepthAb,
            OutputConfiguration::DepthAbConfidence,
            OutputConfiguration::DepthAbXyz,
            OutputConfiguration::DepthAbConfidenceXyz,
        ] {
            assert_eq!(OutputConfiguration::from_code(output.code()), Some(output));
        }
        assert_eq!(OutputConfiguration::from_code(0), None);
        assert_eq!(OutputConfiguration::from_code(9), None);
    }

    #[test]
    fn qmp_without_xyz_keeps_trailing_rgb_out_of_the_tof_planes() {
        let m = FrameMetadata { rgb_width: 64, rgb_height: 64, ..md(512, 1) };
        let px = 512;
        let rgb_len = nv12_len(64, 64);
        let region = px * 2 * 3 + rgb_len;
        let layout = resolve(&m, LayoutVariant::defaults(&m, FormatRevision::V1), region);

        assert!(layout.entry(PlaneKind::Xyz).is_none());
        assert_eq!(layout.tof_end, px * 6);
        let rgb = layout.descriptor(PlaneKind::Rgb).unwrap();
        assert_eq!((rgb.byte_offset, rgb.byte_length), (px * 6, rgb_len));
        assert_disjoint(&layout);
    }

    #[test]
    fn overrides_replace_only_selected_axes() {
        let m = md(1024, 1024);
        let defaults = LayoutVariant::defaults(&m, FormatRevision::V1);
        let ov = LayoutOverrides { confidence: Some(ConfidencePacking::SplitHalves), ..Default::default() };
        let v = ov.apply(defaults);
        assert_eq!(v.output, defaults.output);
        assert_eq!(v.rgb, RgbConvention::Trailing);
        assert_eq!(v.confidence, ConfidencePacking::SplitHalves);
    }

    #[test]
    fn plane_names_round_trip() {
        for kind in PlaneKind::ALL {
            assert_eq!(PlaneKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PlaneKind::from_name("metadata"), None);
    }
}
