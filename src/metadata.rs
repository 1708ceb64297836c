//! Fixed 128-byte metadata block that opens every frame payload.

use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::cursor::ByteCursor;
use crate::error::Result;

pub const METADATA_LENGTH: usize = 128;

pub const DEFAULT_RGB_WIDTH:  u16 = 1920;
pub const DEFAULT_RGB_HEIGHT: u16 = 1200;

/// Widths reported by the quarter-megapixel imager modes.
pub const QMP_WIDTHS: [u16; 4] = [512, 640, 256, 320];
pub const MP_WIDTH:   u16 = 1024;

/// Resolution class of the imager mode that produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorClass {
    Megapixel,
    QuarterMegapixel,
    Other,
}

impl SensorClass {
    pub fn from_width(width: u16) -> Self {
        if width == MP_WIDTH {
            SensorClass::Megapixel
        } else if QMP_WIDTHS.contains(&width) {
            SensorClass::QuarterMegapixel
        } else {
            SensorClass::Other
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub width:                         u16,
    pub height:                        u16,
    pub output_configuration:          u8,
    pub bits_in_depth:                 u8,
    pub bits_in_ab:                    u8,
    pub bits_in_confidence:            u8,
    pub invalid_phase_value:           u16,
    pub frequency_index:               u8,
    pub ab_frequency_index:            u8,
    pub frame_number:                  u32,
    pub imager_mode:                   u8,
    pub number_of_phases:              u8,
    pub number_of_frequencies:         u8,
    pub xyz_enabled:                   bool,
    pub elapsed_time_fractional_value: u32,
    pub elapsed_time_seconds_value:    u32,
    pub sensor_temperature:            i32,
    pub laser_temperature:             i32,
    pub rgb_enabled:                   bool,
    pub rgb_width:                     u16,
    pub rgb_height:                    u16,
}

impl FrameMetadata {
    /// Decode the block at the cursor.  Consumes exactly [`METADATA_LENGTH`]
    /// bytes; fails with `OutOfBounds` (consuming nothing) when fewer remain.
    pub fn parse(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let block = cur.read_bytes(METADATA_LENGTH)?;
        let mut c = ByteCursor::new(block);

        let width                = c.read_u16_le()?;
        let height               = c.read_u16_le()?;
        let output_configuration = c.read_u8()?;
        let bits_in_depth        = c.read_u8()?;
        let bits_in_ab           = c.read_u8()?;
        let bits_in_confidence   = c.read_u8()?;
        let invalid_phase_value  = c.read_u16_le()?;
        let frequency_index      = c.read_u8()?;
        let ab_frequency_index   = c.read_u8()?;
        let frame_number         = c.read_u32_le()?;
        let imager_mode          = c.read_u8()?;
        let number_of_phases     = c.read_u8()?;
        let number_of_frequencies = c.read_u8()?;
        let xyz_enabled          = c.read_u8()? != 0;
        let elapsed_time_fractional_value = c.read_u32_le()?;
        let elapsed_time_seconds_value    = c.read_u32_le()?;
        let sensor_temperature   = c.read_i32_le()?;
        let laser_temperature    = c.read_i32_le()?;
        let rgb_enabled          = c.read_u8()? != 0;
        c.skip(1)?;
        let rgb_width            = c.read_u16_le()?;
        let rgb_height           = c.read_u16_le()?;

        Ok(Self {
            width,
            height,
            output_configuration,
            bits_in_depth,
            bits_in_ab,
            bits_in_confidence,
            invalid_phase_value,
            frequency_index,
            ab_frequency_index,
            frame_number,
            imager_mode,
            number_of_phases,
            number_of_frequencies,
            xyz_enabled,
            elapsed_time_fractional_value,
            elapsed_time_seconds_value,
            sensor_temperature,
            laser_temperature,
            rgb_enabled,
            rgb_width,
            rgb_height,
        })
    }

    /// Encode as a full 128-byte block (reserved bytes zeroed).
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut block = Vec::with_capacity(METADATA_LENGTH);
        block.write_u16::<LittleEndian>(self.width)?;
        block.write_u16::<LittleEndian>(self.height)?;
        block.write_u8(self.output_configuration)?;
        block.write_u8(self.bits_in_depth)?;
        block.write_u8(self.bits_in_ab)?;
        block.write_u8(self.bits_in_confidence)?;
        block.write_u16::<LittleEndian>(self.invalid_phase_value)?;
        block.write_u8(self.frequency_index)?;
        block.write_u8(self.ab_frequency_index)?;
        block.write_u32::<LittleEndian>(self.frame_number)?;
        block.write_u8(self.imager_mode)?;
        block.write_u8(self.number_of_phases)?;
        block.write_u8(self.number_of_frequencies)?;
        block.write_u8(self.xyz_enabled as u8)?;
        block.write_u32::<LittleEndian>(self.elapsed_time_fractional_value)?;
        block.write_u32::<LittleEndian>(self.elapsed_time_seconds_value)?;
        block.write_i32::<LittleEndian>(self.sensor_temperature)?;
        block.write_i32::<LittleEndian>(self.laser_temperature)?;
        block.write_u8(self.rgb_enabled as u8)?;
        block.write_u8(0)?;
        block.write_u16::<LittleEndian>(self.rgb_width)?;
        block.write_u16::<LittleEndian>(self.rgb_height)?;
        block.resize(METADATA_LENGTH, 0);
        writer.write_all(&block)
    }

    pub fn sensor_class(&self) -> SensorClass {
        SensorClass::from_width(self.width)
    }

    /// RGB dimensions, substituting the 1920×1200 default for zero fields.
    pub fn rgb_dimensions(&self) -> (u16, u16) {
        let w = if self.rgb_width == 0 { DEFAULT_RGB_WIDTH } else { self.rgb_width };
        let h = if self.rgb_height == 0 { DEFAULT_RGB_HEIGHT } else { self.rgb_height };
        (w, h)
    }

    /// Elapsed capture time in seconds; the fractional field is a 32-bit
    /// binary fraction of a second.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time_seconds_value as f64
            + self.elapsed_time_fractional_value as f64 / 4_294_967_296.0
    }

    pub fn has_dimensions(&self) -> bool {
        self.width != 0 && self.height != 0
    }

    /// Human-readable dump, one `key: value` per line.
    pub fn write_text<W: Write>(&self, mut w: W, frame_index: usize) -> io::Result<()> {
        writeln!(w, "Metadata for frame {frame_index}:")?;
        writeln!(w, "frameWidth: {}", self.width)?;
        writeln!(w, "frameHeight: {}", self.height)?;
        writeln!(w, "outputconfig: {}", self.output_configuration)?;
        writeln!(w, "depthPhaseBits: {}", self.bits_in_depth)?;
        writeln!(w, "ABBits: {}", self.bits_in_ab)?;
        writeln!(w, "confidenceBits: {}", self.bits_in_confidence)?;
        writeln!(w, "invalidPhaseValue: {}", self.invalid_phase_value)?;
        writeln!(w, "frequencyIndex: {}", self.frequency_index)?;
        writeln!(w, "frameNumber: {}", self.frame_number)?;
        writeln!(w, "imagerMode: {}", self.imager_mode)?;
        writeln!(w, "numberOfPhases: {}", self.number_of_phases)?;
        writeln!(w, "numberOfFrequencies: {}", self.number_of_frequencies)?;
        writeln!(w, "ElapsedTimeinFrac: {}", self.elapsed_time_fractional_value)?;
        writeln!(w, "ElapsedTimeinSec: {}", self.elapsed_time_seconds_value)?;
        writeln!(w, "sensorTemp: {}", self.sensor_temperature)?;
        writeln!(w, "laserTemp: {}", self.laser_temperature)?;
        Ok(())
    }
}
