//! Spill suppression for retained foreground pixels.
//!
//! Key light bouncing off the backdrop tints subject edges. Automatic modes
//! cap the offending channels against the remaining ones; manual mode leaves
//! colors alone.

use image::Rgba;

use crate::key::Mode;

/// Neutralize key-color tint on a pixel that survived keying.
///
/// Pixels with zero alpha and all manual-mode pixels are left untouched.
/// Only color channels change; alpha is never modified.
pub fn despill(px: &mut Rgba<u8>, mode: &Mode) {
    if px[3] == 0 {
        return;
    }
    match mode {
        Mode::Manual(_) => {}
        Mode::AutoGreen => despill_green(px),
        Mode::AutoMagenta => despill_magenta(px),
    }
}

/// Cap green to the brighter of red and blue.
pub fn despill_green(px: &mut Rgba<u8>) {
    let max_rb = px[0].max(px[2]);
    if px[1] > max_rb {
        px[1] = max_rb;
    }
}

/// Pull red and blue down to green when the pixel leans purple.
pub fn despill_magenta(px: &mut Rgba<u8>) {
    let g = px[1];
    if px[0] > g && px[2] > g {
        px[0] = g;
        px[2] = g;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyColor;

    #[test]
    fn green_fringe_is_capped() {
        let mut px = Rgba([90, 160, 70, 200]);
        despill(&mut px, &Mode::AutoGreen);
        assert_eq!(px, Rgba([90, 90, 70, 200]));
    }

    #[test]
    fn unfringed_pixel_is_unchanged() {
        let mut px = Rgba([120, 80, 60, 255]);
        despill(&mut px, &Mode::AutoGreen);
        assert_eq!(px, Rgba([120, 80, 60, 255]));
    }

    #[test]
    fn magenta_fringe_collapses_to_green_anchor() {
        let mut px = Rgba([140, 40, 120, 180]);
        despill(&mut px, &Mode::AutoMagenta);
        assert_eq!(px, Rgba([40, 40, 40, 180]));

        // Only red exceeds green: not a magenta lean
        let mut px = Rgba([140, 40, 20, 255]);
        despill(&mut px, &Mode::AutoMagenta);
        assert_eq!(px, Rgba([140, 40, 20, 255]));
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let mut px = Rgba([0, 255, 0, 0]);
        despill(&mut px, &Mode::AutoGreen);
        assert_eq!(px, Rgba([0, 255, 0, 0]));
    }

    #[test]
    fn manual_mode_never_despills() {
        let mut px = Rgba([10, 250, 10, 255]);
        despill(&mut px, &Mode::Manual(KeyColor::new(0, 255, 0)));
        assert_eq!(px, Rgba([10, 250, 10, 255]));
    }
}
