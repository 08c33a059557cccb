//! Keying pass and file-level processing.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Pixel, Rgba, RgbaImage};

use crate::alpha::{self, KeyParams, DEFAULT_THRESHOLD, PICKED_COLOR_THRESHOLD};
use crate::despill;
use crate::error::{Error, Result};
use crate::geometry::{self, DEFAULT_MAX_DIMENSION};
use crate::key::{self, KeyColor, Mode, Preset};
use crate::raster;
use crate::tone;

/// Options controlling how files are keyed.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Decision boundary (1-100). `None` picks 15, or 30 for a manual key color.
    pub threshold: Option<u8>,
    /// Ramp width (0-50).
    pub smoothing: u8,
    /// Explicit key color; overrides the preset.
    pub key_color: Option<KeyColor>,
    /// Sample the key color at this coordinate of the normalized image.
    pub pick: Option<(u32, u32)>,
    /// Automatic color model used when no key color is set.
    pub preset: Preset,
    /// Longest edge kept before keying.
    pub max_dimension: u32,
    /// Invert the keyed image before classification (dark-background workflow).
    pub invert: bool,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            threshold: None,
            smoothing: alpha::DEFAULT_SMOOTHING,
            key_color: None,
            pick: None,
            preset: Preset::Green,
            max_dimension: DEFAULT_MAX_DIMENSION,
            invert: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl ProcessOptions {
    /// Whether these options select manual (key color distance) keying.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.key_color.is_some() || self.pick.is_some()
    }

    /// Validate threshold and smoothing, filling in the mode's default threshold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for out-of-range values.
    pub fn key_params(&self) -> Result<KeyParams> {
        let default = if self.is_manual() {
            PICKED_COLOR_THRESHOLD
        } else {
            DEFAULT_THRESHOLD
        };
        KeyParams::new(self.threshold.unwrap_or(default), self.smoothing)
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Share of pixels made fully transparent, in `[0, 1]`.
    pub removed: f32,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            removed: 0.0,
            message,
        }
    }
}

/// Key `source` into a new raster. The source is never modified.
#[must_use]
pub fn apply(source: &RgbaImage, mode: Mode, params: KeyParams) -> RgbaImage {
    let mut out = source.clone();
    apply_in_place(&mut out, mode, params);
    out
}

/// Run classification, alpha synthesis and despill over every pixel.
///
/// The incoming alpha channel is ignored and replaced by the synthesized one.
pub fn apply_in_place(raster: &mut RgbaImage, mode: Mode, params: KeyParams) {
    log::debug!(
        "Keying {}x{} with {mode:?} (threshold={}, smoothing={})",
        raster.width(),
        raster.height(),
        params.threshold(),
        params.smoothing()
    );

    match mode {
        Mode::Manual(key_color) => for_each_pixel(raster, |px| {
            px[3] = alpha::alpha(key::manual_score(px, key_color), &mode, params);
        }),
        Mode::AutoGreen => for_each_pixel(raster, |px| {
            px[3] = alpha::alpha(key::green_score(px), &mode, params);
            if px[3] > 0 {
                despill::despill_green(px);
            }
        }),
        Mode::AutoMagenta => for_each_pixel(raster, |px| {
            px[3] = alpha::alpha(key::magenta_score(px), &mode, params);
            if px[3] > 0 {
                despill::despill_magenta(px);
            }
        }),
    }
}

/// Visit every pixel. Pixels are independent, so the `cli` build shards the
/// buffer across rayon workers.
fn for_each_pixel<F>(raster: &mut RgbaImage, f: F)
where
    F: Fn(&mut Rgba<u8>) + Send + Sync,
{
    let samples: &mut [u8] = raster;

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        samples
            .par_chunks_exact_mut(4)
            .for_each(|chunk| f(Rgba::from_slice_mut(chunk)));
    }

    #[cfg(not(feature = "cli"))]
    {
        samples
            .chunks_exact_mut(4)
            .for_each(|chunk| f(Rgba::from_slice_mut(chunk)));
    }
}

/// Once-per-upload preparation: cap the size, then optionally invert.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `max_dimension` is zero.
pub fn prepare(raster: RgbaImage, max_dimension: u32, invert: bool) -> Result<RgbaImage> {
    let mut raster = geometry::normalize(raster, max_dimension)?;
    if invert {
        tone::invert_in_place(&mut raster);
    }
    Ok(raster)
}

/// Share of fully transparent pixels in `raster`.
#[must_use]
pub fn transparent_fraction(raster: &RgbaImage) -> f32 {
    let total = raster.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let clear = raster.pixels().filter(|px| px[3] == 0).count();
    #[allow(clippy::cast_precision_loss)]
    {
        clear as f32 / total as f32
    }
}

/// File-level keying front end holding validated options.
///
/// Create once with [`CutoutEngine::new()`] and reuse for many files.
pub struct CutoutEngine {
    opts: ProcessOptions,
    params: KeyParams,
}

impl CutoutEngine {
    /// Create an engine, validating the options up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an out-of-range threshold,
    /// smoothing, or a zero maximum dimension.
    pub fn new(opts: ProcessOptions) -> Result<Self> {
        let params = opts.key_params()?;
        if opts.max_dimension == 0 {
            return Err(Error::invalid(
                "max dimension",
                0u32,
                1,
                i64::from(u32::MAX),
            ));
        }
        Ok(Self { opts, params })
    }

    /// The options this engine was built with.
    #[must_use]
    pub fn options(&self) -> &ProcessOptions {
        &self.opts
    }

    /// The validated threshold/smoothing pair.
    #[must_use]
    pub fn params(&self) -> KeyParams {
        self.params
    }

    /// Resolve the keying mode for a prepared raster.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the pick coordinate lies
    /// outside the raster.
    pub fn mode_for(&self, raster: &RgbaImage) -> Result<Mode> {
        let key_color = match (self.opts.key_color, self.opts.pick) {
            (Some(color), _) => Some(color),
            (None, Some((x, y))) => {
                let color = raster::sample_key_color(raster, x, y).ok_or_else(|| {
                    let (w, h) = raster.dimensions();
                    if x >= w {
                        Error::invalid("pick x", x, 0, i64::from(w) - 1)
                    } else {
                        Error::invalid("pick y", y, 0, i64::from(h) - 1)
                    }
                })?;
                log::debug!("Picked key color {color} at ({x}, {y})");
                Some(color)
            }
            (None, None) => None,
        };
        Ok(Mode::select(key_color, self.opts.preset))
    }

    /// Load, prepare and key an image, returning the cutout.
    ///
    /// # Errors
    ///
    /// Returns any decode, parameter, or I/O error; no output is produced.
    pub fn cutout(&self, input: &Path) -> Result<RgbaImage> {
        let source = raster::open(input)?;
        let prepared = prepare(source, self.opts.max_dimension, self.opts.invert)?;
        let mode = self.mode_for(&prepared)?;
        Ok(apply(&prepared, mode, self.params))
    }

    /// Process a single image file: load, normalize, key, save.
    ///
    /// Returns a [`ProcessResult`] indicating success or failure. On failure
    /// nothing is written to `output`.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> ProcessResult {
        let keyed = match self.cutout(input) {
            Ok(img) => img,
            Err(e) => return ProcessResult::failed(input, format!("Failed to key: {e}")),
        };

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return ProcessResult::failed(
                        input,
                        format!("Failed to create output directory: {e}"),
                    );
                }
            }
        }

        if let Err(e) = save_image(&keyed, output) {
            return ProcessResult::failed(input, format!("Failed to save: {e}"));
        }

        let removed = transparent_fraction(&keyed);
        log::info!(
            "Keyed {} -> {} ({}x{}, {:.0}% removed)",
            input.display(),
            output.display(),
            keyed.width(),
            keyed.height(),
            removed * 100.0
        );

        ProcessResult {
            path: input.to_path_buf(),
            success: true,
            removed,
            message: "Background removed".to_string(),
        }
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// PNG inputs keep their name inside `output_dir`; other inputs keep their
    /// extension and gain `.png` (`a.jpg` becomes `a.jpg.png`). Inputs whose
    /// output names would still clash are reported as failures and nothing is
    /// written for them.
    #[must_use]
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
        let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult::failed(
                    input_dir,
                    format!("Failed to read directory: {e}"),
                )];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult::failed(
                    output_dir,
                    format!("Failed to create output directory: {e}"),
                )];
            }
        }

        entries.sort();
        let jobs: Vec<(PathBuf, PathBuf)> = entries
            .into_iter()
            .map(|input| {
                let output = output_dir.join(batch_file_name(&input));
                (input, output)
            })
            .collect();

        let mut claims: HashMap<String, usize> = HashMap::new();
        for (_, output) in &jobs {
            *claims.entry(output_key(output)).or_default() += 1;
        }

        let run = |(input_path, output_path): &(PathBuf, PathBuf)| {
            if claims.get(&output_key(output_path)).copied().unwrap_or(0) > 1 {
                log::warn!(
                    "Skipping {}: output {} is shared with another input",
                    input_path.display(),
                    output_path.display()
                );
                return ProcessResult::failed(
                    input_path,
                    format!(
                        "Output name {} is shared with another input",
                        output_path.display()
                    ),
                );
            }
            self.process_file(input_path, output_path)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            jobs.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            jobs.iter().map(run).collect()
        }
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGBA raster in a format that keeps the alpha channel.
///
/// The image is encoded in memory first, so a failed encode never leaves a
/// truncated file behind.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for formats without alpha (or unknown
/// extensions), and [`Error::Io`] / [`Error::Image`] if encoding or writing fails.
pub fn save_image(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    let bytes = match format {
        ImageFormat::Png => raster::encode_png(img)?,
        ImageFormat::WebP => {
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, ImageFormat::WebP)?;
            buf.into_inner()
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!(
                "{format:?} (no alpha channel, use png or webp)"
            )));
        }
    };

    std::fs::write(path, bytes)?;
    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cutout.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(png_file_name(input, "_cutout"))
}

fn batch_file_name(input: &Path) -> String {
    let is_png = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
    if is_png {
        png_file_name(input, "")
    } else {
        let name = input.file_name().unwrap_or_default().to_string_lossy();
        format!("{name}.png")
    }
}

// Compared case-insensitively.
fn output_key(output: &Path) -> String {
    output.to_string_lossy().to_lowercase()
}

fn png_file_name(input: &Path, suffix: &str) -> String {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    format!("{stem}{suffix}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_scene() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 255]));
        for y in 2..6 {
            for x in 2..6 {
                img.put_pixel(x, y, Rgba([200, 50, 40, 255]));
            }
        }
        img
    }

    #[test]
    fn apply_is_deterministic() {
        let src = keyed_scene();
        let p = KeyParams::default();
        for mode in [
            Mode::AutoGreen,
            Mode::AutoMagenta,
            Mode::Manual(KeyColor::new(0, 255, 0)),
        ] {
            assert_eq!(apply(&src, mode, p), apply(&src, mode, p));
        }
    }

    #[test]
    fn apply_leaves_source_untouched() {
        let src = keyed_scene();
        let copy = src.clone();
        let _ = apply(&src, Mode::AutoGreen, KeyParams::default());
        assert_eq!(src, copy);
    }

    #[test]
    fn apply_in_place_matches_sequential_per_pixel_pipeline() {
        let mut src = RgbaImage::new(32, 32);
        for (x, y, px) in src.enumerate_pixels_mut() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *px = Rgba([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8, 255]);
            }
        }
        let p = KeyParams::new(20, 30).unwrap();

        for mode in [Mode::AutoGreen, Mode::AutoMagenta] {
            let keyed = apply(&src, mode, p);
            for (orig, out) in src.pixels().zip(keyed.pixels()) {
                let mut expected = *orig;
                expected[3] = alpha::alpha(mode.score(orig), &mode, p);
                despill::despill(&mut expected, &mode);
                assert_eq!(*out, expected);
            }
        }
    }

    #[test]
    fn incoming_alpha_is_replaced() {
        let src = RgbaImage::from_pixel(2, 2, Rgba([200, 50, 40, 0]));
        let keyed = apply(&src, Mode::AutoGreen, KeyParams::default());
        assert!(keyed.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn prepare_normalizes_then_inverts() {
        let src = RgbaImage::from_pixel(40, 20, Rgba([255, 0, 255, 255]));
        let out = prepare(src, 10, true).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
        for px in out.pixels() {
            assert!(px[0] <= 1 && px[1] >= 254 && px[2] <= 1, "{px:?}");
        }
    }

    #[test]
    fn transparent_fraction_counts_cleared_pixels() {
        let keyed = apply(&keyed_scene(), Mode::AutoGreen, KeyParams::default());
        assert!((transparent_fraction(&keyed) - 48.0 / 64.0).abs() < 1e-6);
        assert_eq!(transparent_fraction(&RgbaImage::new(0, 0)), 0.0);
    }

    #[test]
    fn manual_options_default_to_picked_threshold() {
        let opts = ProcessOptions {
            pick: Some((0, 0)),
            ..ProcessOptions::default()
        };
        assert_eq!(opts.key_params().unwrap().threshold(), 30);
        assert_eq!(
            ProcessOptions::default().key_params().unwrap().threshold(),
            15
        );
        let explicit = ProcessOptions {
            key_color: Some(KeyColor::new(1, 2, 3)),
            threshold: Some(12),
            ..ProcessOptions::default()
        };
        assert_eq!(explicit.key_params().unwrap().threshold(), 12);
    }

    #[test]
    fn engine_rejects_bad_options() {
        let bad = ProcessOptions {
            smoothing: 60,
            ..ProcessOptions::default()
        };
        assert!(CutoutEngine::new(bad).is_err());

        let bad = ProcessOptions {
            max_dimension: 0,
            ..ProcessOptions::default()
        };
        assert!(CutoutEngine::new(bad).is_err());
    }

    #[test]
    fn pick_outside_raster_is_rejected() {
        let engine = CutoutEngine::new(ProcessOptions {
            pick: Some((10, 0)),
            ..ProcessOptions::default()
        })
        .unwrap();
        let img = RgbaImage::new(4, 4);
        assert!(matches!(
            engine.mode_for(&img),
            Err(Error::InvalidParameter { name: "pick x", .. })
        ));
    }

    #[test]
    fn pick_samples_prepared_raster() {
        let engine = CutoutEngine::new(ProcessOptions {
            pick: Some((0, 0)),
            preset: Preset::Magenta,
            ..ProcessOptions::default()
        })
        .unwrap();
        let img = keyed_scene();
        assert_eq!(
            engine.mode_for(&img).unwrap(),
            Mode::Manual(KeyColor::new(0, 255, 0))
        );
    }

    #[test]
    fn default_output_path_appends_cutout_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_cutout.png"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(p.file_name().unwrap().to_str().unwrap(), "image_cutout.png");
    }

    #[test]
    fn batch_file_name_keeps_non_png_extension() {
        assert_eq!(batch_file_name(Path::new("in/a.png")), "a.png");
        assert_eq!(batch_file_name(Path::new("in/a.PNG")), "a.png");
        assert_eq!(batch_file_name(Path::new("in/a.bmp")), "a.bmp.png");
        assert_eq!(batch_file_name(Path::new("in/a.jpg")), "a.jpg.png");
        assert_ne!(
            batch_file_name(Path::new("a.png")),
            batch_file_name(Path::new("a.webp"))
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn save_image_refuses_formats_without_alpha() {
        let img = RgbaImage::new(2, 2);
        let err = save_image(&img, Path::new("/tmp/never-written.jpg")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
