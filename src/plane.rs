//! Raw plane bytes → typed, shaped sample arrays.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DecodeError, Result};
use crate::layout::{PlaneDescriptor, PlaneKind};

/// Element storage of a decoded plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaneData {
    /// Depth, AB and confidence samples.
    U16(Vec<u16>),
    /// XYZ coordinates, interleaved `x, y, z` per pixel.
    I16(Vec<i16>),
    /// NV12 bytes.
    U8(Vec<u8>),
}

impl PlaneData {
    pub fn len(&self) -> usize {
        match self {
            PlaneData::U16(v) => v.len(),
            PlaneData::I16(v) => v.len(),
            PlaneData::U8(v)  => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A plane decoded out of a frame, owned and shape-tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPlane {
    pub kind:     PlaneKind,
    pub width:    usize,
    pub height:   usize,
    pub channels: usize,
    pub data:     PlaneData,
}

impl DecodedPlane {
    pub fn as_u16(&self) -> Option<&[u16]> {
        match &self.data {
            PlaneData::U16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match &self.data {
            PlaneData::I16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            PlaneData::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Row `y` of a single-channel 16-bit plane.
    pub fn row(&self, y: usize) -> Option<&[u16]> {
        let samples = self.as_u16()?;
        let start = y.checked_mul(self.width)?;
        samples.get(start..start + self.width)
    }

    pub fn at(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width {
            return None;
        }
        self.row(y).map(|r| r[x])
    }
}

/// Decode the plane `desc` out of the plane data `region`.
///
/// Never reads outside `desc.byte_offset..desc.end()`.  A descriptor that
/// runs past `region` is `PlaneLayoutMismatch`; a range too short for the
/// declared shape is `InsufficientData`.
pub fn decode(region: &[u8], desc: &PlaneDescriptor) -> Result<DecodedPlane> {
    let bytes = region.get(desc.byte_offset..desc.end()).ok_or(DecodeError::PlaneLayoutMismatch {
        plane:     desc.kind,
        end:       desc.end(),
        available: region.len(),
    })?;
    let pixels = desc.width * desc.height;

    let (channels, data) = match desc.kind {
        PlaneKind::Depth | PlaneKind::Ab => {
            (1, PlaneData::U16(read_u16s(bytes, pixels, plane_what(desc.kind))?))
        }
        PlaneKind::Confidence => (1, PlaneData::U16(decode_confidence(bytes, pixels, desc.bytes_per_sample)?)),
        PlaneKind::Xyz => {
            let needed = pixels * 3 * 2;
            let src = bytes.get(..needed).ok_or(DecodeError::InsufficientData {
                what: "xyz plane",
                needed,
                available: bytes.len(),
            })?;
            let mut out = vec![0i16; pixels * 3];
            LittleEndian::read_i16_into(src, &mut out);
            (3, PlaneData::I16(out))
        }
        PlaneKind::Rgb => (1, PlaneData::U8(bytes.to_vec())),
    };

    Ok(DecodedPlane { kind: desc.kind, width: desc.width, height: desc.height, channels, data })
}

/// Confidence packing follows the descriptor, never the buffer length.
/// Four bytes per sample is one u32 per pixel, narrowed to u16 with
/// saturation.  Two bytes per sample is the re-split form: 32-bit words
/// holding consecutive pixels as low-half-first u16s.  A split buffer may be
/// longer than `w*h*2` (live QMP frames arrive as `w*h*4`); only the first
/// `w*h` halves are pixels.
fn decode_confidence(bytes: &[u8], pixels: usize, bytes_per_sample: usize) -> Result<Vec<u16>> {
    if bytes_per_sample == 4 {
        let needed = pixels * 4;
        let src = bytes.get(..needed).ok_or(DecodeError::InsufficientData {
            what: "confidence plane",
            needed,
            available: bytes.len(),
        })?;
        let mut wide = vec![0u32; pixels];
        LittleEndian::read_u32_into(src, &mut wide);
        Ok(wide.into_iter().map(|v| v.min(u16::MAX as u32) as u16).collect())
    } else {
        read_u16s(bytes, pixels, "confidence plane")
    }
}

fn read_u16s(bytes: &[u8], count: usize, what: &'static str) -> Result<Vec<u16>> {
    let needed = count * 2;
    let src = bytes.get(..needed).ok_or(DecodeError::InsufficientData {
        what,
        needed,
        available: bytes.len(),
    })?;
    let mut out = vec![0u16; count];
    LittleEndian::read_u16_into(src, &mut out);
    Ok(out)
}

fn plane_what(kind: PlaneKind) -> &'static str {
    match kind {
        PlaneKind::Depth => "depth plane",
        PlaneKind::Ab    => "ab plane",
        _                => "plane",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(kind: PlaneKind, offset: usize, length: usize, w: usize, h: usize) -> PlaneDescriptor {
        PlaneDescriptor {
            kind,
            byte_offset: offset,
            byte_length: length,
            width: w,
            height: h,
            bytes_per_sample: 2,
            channels: 1,
        }
    }

    fn direct32(length: usize, w: usize, h: usize) -> PlaneDescriptor {
        PlaneDescriptor { bytes_per_sample: 4, ..desc(PlaneKind::Confidence, 0, length, w, h) }
    }

    #[test]
    fn depth_two_by_two_is_row_major() {
        let region = [1, 0, 2, 0, 3, 0, 4, 0, 0xEE, 0xEE];
        let plane = decode(&region, &desc(PlaneKind::Depth, 0, 8, 2, 2)).unwrap();
        assert_eq!(plane.as_u16().unwrap(), &[1, 2, 3, 4]);
        assert_eq!(plane.row(0).unwrap(), &[1, 2]);
        assert_eq!(plane.row(1).unwrap(), &[3, 4]);
        assert_eq!(plane.at(1, 1), Some(4));
        assert_eq!(plane.at(2, 0), None);
        assert_eq!(plane.row(2), None);
    }

    #[test]
    fn confidence_direct_32_saturates() {
        let mut region = Vec::new();
        for v in [7u32, 0x0001_0000, 300, 0] {
            region.extend_from_slice(&v.to_le_bytes());
        }
        let plane = decode(&region, &direct32(16, 2, 2)).unwrap();
        assert_eq!(plane.as_u16().unwrap(), &[7, u16::MAX, 300, 0]);
    }

    #[test]
    fn split_halves_over_a_word_per_pixel_buffer_reads_leading_halves() {
        let mut region = Vec::new();
        for v in 1u16..=8 {
            region.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(region.len(), 2 * 2 * 4);
        let plane = decode(&region, &desc(PlaneKind::Confidence, 0, 16, 2, 2)).unwrap();
        assert_eq!(plane.as_u16().unwrap(), &[1, 2, 3, 4]);

        let err = decode(&region[..12], &direct32(12, 2, 2)).unwrap_err();
        assert!(matches!(err, DecodeError::InsufficientData { needed: 16, available: 12, .. }));
    }

    #[test]
    fn confidence_split_halves_low_half_first() {
        // Two 32-bit words, each carrying two pixels.
        let mut region = Vec::new();
        region.extend_from_slice(&0x0002_0001u32.to_le_bytes());
        region.extend_from_slice(&0x0004_0003u32.to_le_bytes());
        let plane = decode(&region, &desc(PlaneKind::Confidence, 0, 8, 2, 2)).unwrap();
        assert_eq!(plane.as_u16().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn xyz_is_signed_triplets() {
        let mut region = vec![0u8; 4];
        for v in [10i16, -5, 3] {
            region.extend_from_slice(&v.to_le_bytes());
        }
        let plane = decode(&region, &desc(PlaneKind::Xyz, 4, 6, 1, 1)).unwrap();
        assert_eq!(plane.channels, 3);
        assert_eq!(plane.as_i16().unwrap(), &[10, -5, 3]);
    }

    #[test]
    fn descriptor_past_region_is_layout_mismatch() {
        let region = [0u8; 6];
        let err = decode(&region, &desc(PlaneKind::Ab, 0, 8, 2, 2)).unwrap_err();
        assert_eq!(err, DecodeError::PlaneLayoutMismatch { plane: PlaneKind::Ab, end: 8, available: 6 });
    }

    #[test]
    fn range_shorter_than_shape_is_insufficient() {
        let region = [0u8; 20];
        let err = decode(&region, &desc(PlaneKind::Xyz, 0, 20, 2, 2)).unwrap_err();
        assert!(matches!(err, DecodeError::InsufficientData { needed: 24, available: 20, .. }));
    }
}
