//! Decode and export settings.
//!
//! Both structs are plain serde data with `Default`, so a JSON config file
//! only needs the keys it wants to change:
//!
//! ```json
//! {
//!   "decode": { "fallback_dimensions": [512, 512], "layout": { "rgb": "reported" } },
//!   "export": { "log_ab": true }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::encode::Palette;
use crate::layout::LayoutOverrides;

/// JPEG quality used for RGB exports.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Per-axis overrides of the default layout variant.
    pub layout:              LayoutOverrides,
    /// `(width, height)` used for headerless recordings whose metadata
    /// reports zero dimensions.
    pub fallback_dimensions: Option<(u16, u16)>,
    /// Convert the NV12 plane to an RGB image.
    pub convert_rgb:         bool,
    /// Build a point cloud from the XYZ plane.
    pub point_cloud:         bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            layout:              LayoutOverrides::default(),
            fallback_dimensions: None,
            convert_rgb:         true,
            point_cloud:         true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub depth_palette:      Palette,
    pub ab_palette:         Palette,
    pub confidence_palette: Palette,
    /// Logarithmic AB encoding.
    pub log_ab:             bool,
    pub write_metadata:     bool,
    pub write_point_cloud:  bool,
    pub write_rgb:          bool,
    pub jpeg_quality:       u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            depth_palette:      Palette::Turbo,
            ab_palette:         Palette::Grayscale,
            confidence_palette: Palette::InvertedGrayscale,
            log_ab:             false,
            write_metadata:     true,
            write_point_cloud:  true,
            write_rgb:          true,
            jpeg_quality:       DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Everything the CLI can load from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decode: DecodeOptions,
    pub export: ExportOptions,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: String, source: serde_json::Error },
}

impl Config {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: shown.clone(), source })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse { path: shown, source })
    }
}

// ── Frame ranges ──────────────────────────────────────────────────────────────

/// Inclusive range of frame indices: `N`, `N-` (N to end) or `N-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: usize,
    /// Inclusive; `None` runs to the end of the recording.
    pub end:   Option<usize>,
}

impl FrameRange {
    pub fn all() -> Self {
        Self { start: 0, end: None }
    }

    pub fn single(index: usize) -> Self {
        Self { start: index, end: Some(index) }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && self.end.map_or(true, |end| index <= end)
    }

    /// Clip to a recording holding `available` frames.
    pub fn indices(&self, available: usize) -> Range<usize> {
        let end = self.end.map_or(available, |e| (e + 1).min(available));
        self.start.min(end)..end
    }
}

impl Default for FrameRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid frame range {input:?}: {reason}")]
pub struct FrameRangeError {
    pub input:  String,
    pub reason: &'static str,
}

impl FromStr for FrameRange {
    type Err = FrameRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| FrameRangeError { input: s.to_owned(), reason };
        let num = |t: &str| t.trim().parse::<usize>().map_err(|_| err("expected a non-negative frame number"));

        let range = match s.split_once('-') {
            None => Self::single(num(s)?),
            Some((a, b)) if b.trim().is_empty() => Self { start: num(a)?, end: None },
            Some((a, b)) => Self { start: num(a)?, end: Some(num(b)?) },
        };
        match range.end {
            Some(end) if end < range.start => Err(err("end precedes start")),
            _ => Ok(range),
        }
    }
}
