//! NV12 → RGB conversion (BT.601, full-range, nearest-neighbour chroma).

use crate::error::{DecodeError, Result};
use crate::layout::nv12_len;

/// Interleaved 8-bit RGB image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width:  usize,
    pub height: usize,
    /// `[r, g, b, r, g, b, ...]`, `width * height * 3` bytes.
    pub data:   Vec<u8>,
}

impl RgbImage {
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }
}

/// Convert an NV12 buffer of `width × height` pixels.
///
/// The luma plane is `width * height` bytes, followed by interleaved `U, V`
/// pairs at half resolution in both axes.  Each chroma sample covers a 2×2
/// block of luma.  Extra trailing bytes are ignored; a short buffer is
/// `InsufficientData`.
pub fn nv12_to_rgb(nv12: &[u8], width: usize, height: usize) -> Result<RgbImage> {
    let needed = nv12_len(width, height);
    if nv12.len() < needed {
        return Err(DecodeError::InsufficientData {
            what: "nv12 image",
            needed,
            available: nv12.len(),
        });
    }

    let (luma, chroma) = nv12.split_at(width * height);
    let chroma_stride = width.div_ceil(2) * 2;
    let mut data = Vec::with_capacity(width * height * 3);

    for y in 0..height {
        let luma_row = &luma[y * width..(y + 1) * width];
        let chroma_row = &chroma[(y / 2) * chroma_stride..];
        for (x, &luma_px) in luma_row.iter().enumerate() {
            let uv = (x / 2) * 2;
            data.extend_from_slice(&yuv_to_rgb(luma_px, chroma_row[uv], chroma_row[uv + 1]));
        }
    }

    Ok(RgbImage { width, height, data })
}

/// BT.601 full-range YUV → RGB for one pixel.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn to_u8(c: f32) -> u8 {
    c.round().clamp(0.0, 255.0) as u8
}
