//! Bounded-size normalization of uploaded rasters.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::{Error, Result};

/// Longest edge kept by default before keying.
pub const DEFAULT_MAX_DIMENSION: u32 = 1536;

/// Compute the size `(width, height)` fits into when its longest edge is
/// capped at `max_dimension`.
///
/// The longer edge becomes exactly `max_dimension`; the shorter one is
/// scaled by the same factor and rounded to nearest, never below 1.
#[must_use]
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = |side: u32| {
        let scaled = (f64::from(side) * f64::from(max_dimension) / f64::from(longest)).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (scaled as u32).max(1)
        }
    };

    if width >= height {
        (max_dimension, scale(height))
    } else {
        (scale(width), max_dimension)
    }
}

/// Downsample `raster` so neither edge exceeds `max_dimension`.
///
/// Rasters already within bounds are returned untouched. Larger ones are
/// resampled with a Catmull-Rom (bicubic) filter.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `max_dimension` is zero.
pub fn normalize(raster: RgbaImage, max_dimension: u32) -> Result<RgbaImage> {
    if max_dimension == 0 {
        return Err(Error::invalid("max dimension", 0u32, 1, i64::from(u32::MAX)));
    }

    let (width, height) = raster.dimensions();
    let (new_w, new_h) = target_dimensions(width, height, max_dimension);
    if (new_w, new_h) == (width, height) {
        return Ok(raster);
    }

    log::debug!("Resizing {width}x{height} -> {new_w}x{new_h}");
    Ok(imageops::resize(&raster, new_w, new_h, FilterType::CatmullRom))
}
