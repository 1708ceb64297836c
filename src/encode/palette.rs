use serde::{Deserialize, Serialize};

/// Mapping from a normalised 8-bit level to an output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Palette {
    /// Single channel, level passed through.
    Grayscale,
    /// Single channel, `255 - level`.  Used for confidence so that confident
    /// pixels render dark.
    InvertedGrayscale,
    /// Perceptually ordered blue → red rainbow.
    Turbo,
    /// Classic blue → cyan → yellow → red.
    Jet,
}

impl Palette {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gray" | "grey" | "grayscale" => Some(Palette::Grayscale),
            "inverted" | "inverted-grayscale" => Some(Palette::InvertedGrayscale),
            "turbo" => Some(Palette::Turbo),
            "jet" => Some(Palette::Jet),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Palette::Grayscale         => "grayscale",
            Palette::InvertedGrayscale => "inverted-grayscale",
            Palette::Turbo             => "turbo",
            Palette::Jet               => "jet",
        }
    }

    /// Output channels per pixel (1 or 3).
    pub fn channels(self) -> usize {
        match self {
            Palette::Grayscale | Palette::InvertedGrayscale => 1,
            Palette::Turbo | Palette::Jet => 3,
        }
    }

    /// Precompute all 256 entries.  Grey palettes replicate the level across
    /// the three slots; callers take the first `channels()` bytes.
    pub fn lut(self) -> [[u8; 3]; 256] {
        let mut lut = [[0u8; 3]; 256];
        for (level, entry) in lut.iter_mut().enumerate() {
            *entry = self.color(level as u8);
        }
        lut
    }

    pub fn color(self, level: u8) -> [u8; 3] {
        let x = level as f64 / 255.0;
        match self {
            Palette::Grayscale => [level; 3],
            Palette::InvertedGrayscale => [255 - level; 3],
            Palette::Turbo => [
                unit(turbo_poly(x, &TURBO_R)),
                unit(turbo_poly(x, &TURBO_G)),
                unit(turbo_poly(x, &TURBO_B)),
            ],
            Palette::Jet => [
                unit(1.5 - (4.0 * x - 3.0).abs()),
                unit(1.5 - (4.0 * x - 2.0).abs()),
                unit(1.5 - (4.0 * x - 1.0).abs()),
            ],
        }
    }
}

// Degree-5 polynomial fit of the Turbo colormap, per channel, lowest order first.
const TURBO_R: [f64; 6] = [0.135_721_38, 4.615_392_60, -42.660_322_58, 132.131_082_34, -152.942_393_96, 59.286_379_43];
const TURBO_G: [f64; 6] = [0.091_402_61, 2.194_188_39, 4.842_966_58, -14.185_033_33, 4.277_298_57, 2.829_566_04];
const TURBO_B: [f64; 6] = [0.106_673_30, 12.641_946_08, -60.582_048_36, 110.362_767_71, -89.903_109_12, 27.348_249_73];

fn turbo_poly(x: f64, c: &[f64; 6]) -> f64 {
    c.iter().rev().fold(0.0, |acc, &k| acc * x + k)
}

fn unit(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
