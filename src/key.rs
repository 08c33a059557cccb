//! Key classification: how background-like is a pixel?
//!
//! Three mutually exclusive models produce a scalar score per pixel:
//! 1. **Manual**: Euclidean distance to a user-picked key color (low = background)
//! 2. **Auto-Green**: green-difference keying `g - max(r, b)` (high = background)
//! 3. **Auto-Magenta**: inverted distance to pure magenta (high = background)

use std::fmt;
use std::str::FromStr;

use image::Rgba;

/// Divisor bringing the 0..=441 Euclidean range onto the threshold scale (manual mode).
///
/// Calibration constant, tuned by eye against the slider range.
pub const MANUAL_DISTANCE_DIVISOR: f64 = 3.0;

/// Divisor calibrating magenta distance onto the threshold scale.
///
/// Calibration constant, tuned by eye against the slider range.
pub const MAGENTA_DISTANCE_DIVISOR: f64 = 1.7;

/// Pure key magenta, `#FF00FF`.
pub const MAGENTA: KeyColor = KeyColor::new(255, 0, 255);

/// Pure key green, `#00FF00`.
pub const GREEN: KeyColor = KeyColor::new(0, 255, 0);

/// An explicit key color picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl KeyColor {
    /// Create a key color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean distance between this color and the RGB part of `px`.
    #[must_use]
    pub fn distance(&self, px: &Rgba<u8>) -> f64 {
        let dr = f64::from(px[0]) - f64::from(self.r);
        let dg = f64::from(px[1]) - f64::from(self.g);
        let db = f64::from(px[2]) - f64::from(self.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl fmt::Display for KeyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Rgba<u8>> for KeyColor {
    fn from(px: Rgba<u8>) -> Self {
        Self::new(px[0], px[1], px[2])
    }
}

/// Parses `"r,g,b"` (decimal) or `"#rrggbb"` / `"rrggbb"` (hex).
impl FromStr for KeyColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(format!("expected three channels in \"{s}\""));
            }
            let mut channels = [0u8; 3];
            for (slot, part) in channels.iter_mut().zip(&parts) {
                *slot = part
                    .parse()
                    .map_err(|_| format!("channel \"{part}\" is not in 0..=255"))?;
            }
            return Ok(Self::new(channels[0], channels[1], channels[2]));
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("expected \"r,g,b\" or \"#rrggbb\", got \"{s}\""));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex color \"{s}\""))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Which flat background the isolation step painted behind the subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Preset {
    /// Pure green `#00FF00`, for subjects on light backgrounds.
    #[default]
    Green,
    /// Pure magenta `#FF00FF`, for dark subjects (the inverted workflow).
    Magenta,
}

impl Preset {
    /// The flat key color this preset expects.
    #[must_use]
    pub const fn key_color(self) -> KeyColor {
        match self {
            Self::Green => GREEN,
            Self::Magenta => MAGENTA,
        }
    }
}

/// The active classification model for one keying pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Distance from an explicit key color. Low score means background.
    Manual(KeyColor),
    /// Green-difference keying. High score means background.
    AutoGreen,
    /// Proximity to pure magenta. High score means background.
    AutoMagenta,
}

impl Mode {
    /// Resolve the mode: an explicit key color always wins over the preset.
    #[must_use]
    pub fn select(key_color: Option<KeyColor>, preset: Preset) -> Self {
        match (key_color, preset) {
            (Some(key), _) => Self::Manual(key),
            (None, Preset::Green) => Self::AutoGreen,
            (None, Preset::Magenta) => Self::AutoMagenta,
        }
    }

    /// Background-likeness score of a single pixel under this mode.
    #[must_use]
    pub fn score(&self, px: &Rgba<u8>) -> f64 {
        match self {
            Self::Manual(key) => manual_score(px, *key),
            Self::AutoGreen => green_score(px),
            Self::AutoMagenta => magenta_score(px),
        }
    }
}

/// Manual score: `distance(px, key) / 3`.
#[must_use]
pub fn manual_score(px: &Rgba<u8>, key: KeyColor) -> f64 {
    key.distance(px) / MANUAL_DISTANCE_DIVISOR
}

/// Green-difference score: `g - max(r, b)`, in `[-255, 255]`.
#[must_use]
pub fn green_score(px: &Rgba<u8>) -> f64 {
    let max_rb = px[0].max(px[2]);
    f64::from(i16::from(px[1]) - i16::from(max_rb))
}

/// Magenta score: `255 - distance(px, #FF00FF) / 1.7`.
#[must_use]
pub fn magenta_score(px: &Rgba<u8>) -> f64 {
    255.0 - MAGENTA.distance(px) / MAGENTA_DISTANCE_DIVISOR
}
