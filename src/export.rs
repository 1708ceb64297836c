//! On-disk export of decoded frames.
//!
//! One directory per frame, named after the recording:
//!
//! ```text
//! <out>/<base>_<idx>/metadata_<base>_<idx>.txt
//!                   /depth_<base>_<idx>.png        Turbo palette
//!                   /ab_<base>_<idx>.png           grayscale (optionally log)
//!                   /conf_<base>_<idx>.png         inverted grayscale
//!                   /pointcloud_<base>_<idx>.ply   ASCII PLY
//!                   /rgb_<base>_<idx>.jpg          converted NV12
//! ```
//!
//! Planes that were skipped or absent simply produce no file.

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ExtendedColorType, ImageEncoder};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::color::RgbImage;
use crate::encode::{self, Image8};
use crate::error::DecodeError;
use crate::frame::DecodedFrame;
use crate::layout::PlaneKind;
use crate::options::ExportOptions;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{width}x{height} image does not fit the encoder's u32 dimensions")]
    Dimensions { width: usize, height: usize },
}

pub type Result<T> = std::result::Result<T, ExportError>;

fn dims(width: usize, height: usize) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(ExportError::Dimensions { width, height }),
    }
}

/// Write a 1- or 3-channel image as PNG.
pub fn write_png(path: &Path, img: &Image8) -> Result<()> {
    let (w, h) = dims(img.width, img.height)?;
    let color = if img.channels == 3 { ColorType::Rgb8 } else { ColorType::L8 };
    image::save_buffer_with_format(path, &img.data, w, h, color, image::ImageFormat::Png)?;
    Ok(())
}

pub fn write_jpeg(path: &Path, img: &RgbImage, quality: u8) -> Result<()> {
    let (w, h) = dims(img.width, img.height)?;
    let out = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(out, quality.clamp(1, 100)).write_image(&img.data, w, h, ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Files written for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportedFiles {
    pub directory: PathBuf,
    pub files:     Vec<PathBuf>,
}

/// Writes frames of one recording below an output directory.
#[derive(Debug, Clone)]
pub struct FrameExporter {
    out_dir:   PathBuf,
    base_name: String,
    options:   ExportOptions,
}

impl FrameExporter {
    pub fn new(out_dir: impl Into<PathBuf>, base_name: impl Into<String>, options: ExportOptions) -> Self {
        Self { out_dir: out_dir.into(), base_name: base_name.into(), options }
    }

    /// Base name from a recording path: file name without extension.
    pub fn base_name_of(path: &Path) -> String {
        path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "frame".to_string())
    }

    pub fn frame_dir(&self, index: usize) -> PathBuf {
        self.out_dir.join(format!("{}_{index}", self.base_name))
    }

    fn file(&self, dir: &Path, prefix: &str, index: usize, ext: &str) -> PathBuf {
        dir.join(format!("{prefix}_{}_{index}.{ext}", self.base_name))
    }

    pub fn export(&self, index: usize, frame: &DecodedFrame) -> Result<ExportedFiles> {
        let dir = self.frame_dir(index);
        fs::create_dir_all(&dir)?;
        let mut files = Vec::new();
        let opts = &self.options;

        if opts.write_metadata {
            let path = self.file(&dir, "metadata", index, "txt");
            let mut w = BufWriter::new(File::create(&path)?);
            frame.metadata.write_text(&mut w, index)?;
            w.flush()?;
            files.push(path);
        }

        let images = [
            (PlaneKind::Depth, "depth", opts.depth_palette, false),
            (PlaneKind::Ab, "ab", opts.ab_palette, opts.log_ab),
            (PlaneKind::Confidence, "conf", opts.confidence_palette, false),
        ];
        for (kind, prefix, palette, log) in images {
            if let Some(plane) = frame.plane(kind) {
                let img = encode::encode_plane(plane, palette, log)?;
                let path = self.file(&dir, prefix, index, "png");
                write_png(&path, &img)?;
                files.push(path);
            }
        }

        if opts.write_point_cloud {
            if let Some(cloud) = &frame.point_cloud {
                let path = self.file(&dir, "pointcloud", index, "ply");
                let mut w = BufWriter::new(File::create(&path)?);
                cloud.write_ply(&mut w)?;
                w.flush()?;
                files.push(path);
            }
        }

        if opts.write_rgb {
            if let Some(rgb) = &frame.rgb {
                let path = self.file(&dir, "rgb", index, "jpg");
                write_jpeg(&path, rgb, opts.jpeg_quality)?;
                files.push(path);
            }
        }

        debug!(frame = index, files = files.len(), dir = %dir.display(), "frame exported");
        Ok(ExportedFiles { directory: dir, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Palette;

    #[test]
    fn png_round_trips_through_image_crate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        let img = encode::encode(&[0u16, 100, 200, 300], 2, 2, Palette::Grayscale).unwrap();
        write_png(&path, &img).unwrap();

        let back = image::open(&path).unwrap().into_luma8();
        assert_eq!(back.dimensions(), (2, 2));
        assert_eq!(back.into_raw(), img.data);
    }

    #[test]
    fn jpeg_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.jpg");
        let img = RgbImage { width: 8, height: 8, data: vec![200; 8 * 8 * 3] };
        write_jpeg(&path, &img, 90).unwrap();
        let back = image::open(&path).unwrap().into_rgb8();
        assert_eq!(back.dimensions(), (8, 8));
    }

    #[test]
    fn base_name_strips_extension() {
        assert_eq!(FrameExporter::base_name_of(Path::new("/data/capture_01.bin")), "capture_01");
        let ex = FrameExporter::new("/out", "rec", ExportOptions::default());
        assert_eq!(ex.frame_dir(3), PathBuf::from("/out/rec_3"));
    }
}
