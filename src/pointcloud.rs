//! Point-cloud reconstruction from the packed XYZ plane.
//!
//! Each pixel contributes one signed 16-bit `(x, y, z)` triplet.  All-zero
//! triplets mark pixels without a valid measurement and are dropped.  The
//! remaining points are flipped into the display convention (Y and Z
//! negated) so the cloud renders upright in right-handed viewers.

use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, Write};

use crate::error::{DecodeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Count and axis-aligned extents of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointCloudStats {
    pub count: usize,
    /// `None` for an empty cloud.
    pub min:   Option<[i32; 3]>,
    pub max:   Option<[i32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointCloud {
    /// Valid points in source raster order.
    pub points: Vec<Point3D>,
    pub stats:  PointCloudStats,
    /// Pixels discarded as invalid.
    pub invalid: usize,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// ASCII PLY: header, then one `x y z` line per point.
    pub fn write_ply<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "ply")?;
        writeln!(w, "format ascii 1.0")?;
        writeln!(w, "element vertex {}", self.points.len())?;
        writeln!(w, "property float x")?;
        writeln!(w, "property float y")?;
        writeln!(w, "property float z")?;
        writeln!(w, "end_header")?;
        for p in &self.points {
            writeln!(w, "{} {} {}", p.x, p.y, p.z)?;
        }
        Ok(())
    }
}

/// Build the cloud from interleaved `x, y, z` samples.
///
/// Fails with `InsufficientData` when fewer than `width * height` triplets
/// are available; extra samples past that count are ignored.
pub fn build(xyz: &[i16], width: usize, height: usize) -> Result<PointCloud> {
    let triplets = width * height;
    if xyz.len() < triplets * 3 {
        return Err(DecodeError::InsufficientData {
            what:      "xyz triplets",
            needed:    triplets * 3 * 2,
            available: xyz.len() * 2,
        });
    }

    let mut points = Vec::new();
    let mut min = [i32::MAX; 3];
    let mut max = [i32::MIN; 3];

    for t in xyz[..triplets * 3].chunks_exact(3) {
        if t[0] == 0 && t[1] == 0 && t[2] == 0 {
            continue;
        }
        let p = Point3D { x: t[0] as i32, y: -(t[1] as i32), z: -(t[2] as i32) };
        for (axis, v) in [p.x, p.y, p.z].into_iter().enumerate() {
            min[axis] = min[axis].min(v);
            max[axis] = max[axis].max(v);
        }
        points.push(p);
    }

    let count = points.len();
    let stats = PointCloudStats {
        count,
        min: (count > 0).then_some(min),
        max: (count > 0).then_some(max),
    };
    Ok(PointCloud { points, stats, invalid: triplets - count })
}

/// Same as [`build`] but straight from little-endian plane bytes.
pub fn build_from_bytes(bytes: &[u8], width: usize, height: usize) -> Result<PointCloud> {
    let needed = width * height * 6;
    if bytes.len() < needed {
        return Err(DecodeError::InsufficientData {
            what:      "xyz triplets",
            needed,
            available: bytes.len(),
        });
    }
    let mut samples = vec![0i16; width * height * 3];
    LittleEndian::read_i16_into(&bytes[..needed], &mut samples);
    build(&samples, width, height)
}
