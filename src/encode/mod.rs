//! Min-max normalisation of numeric planes into 8-bit images.
//!
//! `encode` linearly rescales `[min, max]` onto `[0, 255]` and maps each
//! level through a [`Palette`].  `encode_log` additionally applies
//! `255 / ln(1 + max) * ln(1 + level)` to the normalised levels, which lifts
//! the dark end of wide-dynamic-range AB data.  A plane whose samples are
//! all equal has no range to stretch and encodes as uniform mid-grey.

pub mod palette;

pub use palette::Palette;

use crate::error::{DecodeError, Result};
use crate::plane::{DecodedPlane, PlaneData};

pub const MID_GRAY: u8 = 128;

/// Numeric sample that can be normalised.
pub trait Sample: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(impl Sample for $t {
            #[inline]
            fn to_f64(self) -> f64 { self as f64 }
        })*
    };
}

impl_sample!(u8, u16, i16, u32, i32, f32, f64);

/// 8-bit image, row-major, `channels` bytes per pixel (1 or 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image8 {
    pub width:    usize,
    pub height:   usize,
    pub channels: usize,
    pub data:     Vec<u8>,
}

impl Image8 {
    pub fn is_uniform(&self) -> bool {
        let px = self.channels.max(1);
        if self.data.len() < px {
            return true;
        }
        self.data.chunks(px).all(|p| p == &self.data[..px])
    }
}

/// Rescale `samples` onto `0..=255`.  `None` when the set is empty or
/// degenerate (`min == max`, or contains no finite values).
pub fn normalize<S: Sample>(samples: &[S]) -> Option<Vec<u8>> {
    let (min, max) = samples
        .iter()
        .map(|s| s.to_f64())
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if min == max {
        return None;
    }
    let scale = 255.0 / (max - min);
    Some(
        samples
            .iter()
            .map(|s| {
                let v = s.to_f64();
                if v.is_finite() { ((v - min) * scale).round().clamp(0.0, 255.0) as u8 } else { 0 }
            })
            .collect(),
    )
}

/// Linear normalisation followed by `palette`.
pub fn encode<S: Sample>(samples: &[S], width: usize, height: usize, palette: Palette) -> Result<Image8> {
    let samples = shaped(samples, width, height)?;
    Ok(match normalize(samples) {
        Some(levels) => apply(&levels, width, height, palette),
        None => uniform(width, height, palette),
    })
}

/// Linear normalisation, then logarithmic compression, then `palette`.
pub fn encode_log<S: Sample>(samples: &[S], width: usize, height: usize, palette: Palette) -> Result<Image8> {
    let samples = shaped(samples, width, height)?;
    let Some(levels) = normalize(samples) else {
        return Ok(uniform(width, height, palette));
    };
    let peak = levels.iter().copied().max().unwrap_or(0) as f64;
    let c = 255.0 / (1.0 + peak).ln();
    let levels: Vec<u8> = levels
        .iter()
        .map(|&l| (c * (1.0 + l as f64).ln()).clamp(0.0, 255.0) as u8)
        .collect();
    Ok(apply(&levels, width, height, palette))
}

/// Encode a single-channel decoded plane.  Multi-channel planes (XYZ) are
/// encoded on their Z channel, the range axis.
pub fn encode_plane(plane: &DecodedPlane, palette: Palette, log: bool) -> Result<Image8> {
    let (w, h) = (plane.width, plane.height);
    match &plane.data {
        PlaneData::U16(v) if log => encode_log(v, w, h, palette),
        PlaneData::U16(v) => encode(v, w, h, palette),
        PlaneData::I16(v) => {
            let z: Vec<i16> = v.chunks_exact(plane.channels.max(1)).map(|t| t[t.len() - 1]).collect();
            if log { encode_log(&z, w, h, palette) } else { encode(&z, w, h, palette) }
        }
        PlaneData::U8(v) if log => encode_log(v, w, h, palette),
        PlaneData::U8(v) => encode(v, w, h, palette),
    }
}

fn shaped<S>(samples: &[S], width: usize, height: usize) -> Result<&[S]> {
    let n = width * height;
    samples.get(..n).ok_or(DecodeError::InsufficientData {
        what:      "samples to encode",
        needed:    n,
        available: samples.len(),
    })
}

fn apply(levels: &[u8], width: usize, height: usize, palette: Palette) -> Image8 {
    let channels = palette.channels();
    let data = match palette {
        Palette::Grayscale => levels.to_vec(),
        Palette::InvertedGrayscale => levels.iter().map(|&l| 255 - l).collect(),
        Palette::Turbo | Palette::Jet => {
            let lut = palette.lut();
            levels.iter().flat_map(|&l| lut[l as usize]).collect()
        }
    };
    Image8 { width, height, channels, data }
}

fn uniform(width: usize, height: usize, palette: Palette) -> Image8 {
    let channels = palette.channels();
    Image8 { width, height, channels, data: vec![MID_GRAY; width * height * channels] }
}
