//! Color inversion for the dark-background workflow.
//!
//! Inverting before isolation turns a dark canvas light; inverting the keyed
//! result turns the green backdrop into magenta behind the original subject.

use image::RgbaImage;

/// Return an inverted copy of `raster`. Alpha is preserved.
#[must_use]
pub fn invert(raster: &RgbaImage) -> RgbaImage {
    let mut out = raster.clone();
    invert_in_place(&mut out);
    out
}

/// Invert the color channels of `raster` in place: `c' = 255 - c`.
pub fn invert_in_place(raster: &mut RgbaImage) {
    for px in raster.pixels_mut() {
        for ch in 0..3 {
            px[ch] = 255 - px[ch];
        }
    }
}
