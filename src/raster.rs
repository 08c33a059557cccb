//! RGBA raster acquisition and transport encoding.
//!
//! The keying pass works on [`image::RgbaImage`]; this module is the boundary
//! where bytes become pixels and back.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};
use crate::key::KeyColor;

/// Decode an encoded image (PNG, JPEG, WebP, ...) into an RGBA raster.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a decodable image.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(Error::Decode)?;
    Ok(img.to_rgba8())
}

/// Read and decode an image file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and [`Error::Decode`] if
/// its content is not a decodable image.
pub fn open(path: &Path) -> Result<RgbaImage> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encode a raster as PNG, preserving alpha.
///
/// # Errors
///
/// Returns [`Error::Image`] if encoding fails.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    raster.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Read the key color under `(x, y)` from the raw keyed image.
///
/// Returns `None` when the coordinate is outside the raster.
#[must_use]
pub fn sample_key_color(raster: &RgbaImage, x: u32, y: u32) -> Option<KeyColor> {
    raster.get_pixel_checked(x, y).map(|px| KeyColor::from(*px))
}
