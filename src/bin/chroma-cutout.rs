use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::LevelFilter;

use chroma_cutout::{
    default_output_path, CutoutEngine, KeyColor, Preset, ProcessOptions, ProcessResult,
};

#[derive(Parser)]
#[command(
    name = "chroma-cutout",
    about = "Cut subjects out of green- or magenta-keyed images",
    version,
    after_help = "Simple usage: chroma-cutout <image>  (writes <image>_cutout.png)\n\n\
                  The input must already have a flat #00FF00 or #FF00FF background.\n\
                  For dark subjects keyed on an inverted canvas, pass --invert --preset magenta."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_cutout.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Decision boundary, 1-100 (default: 15, or 30 with a key color)
    #[arg(short, long)]
    threshold: Option<u8>,

    /// Width of the soft edge, 0-50
    #[arg(short, long, default_value_t = chroma_cutout::alpha::DEFAULT_SMOOTHING)]
    smoothing: u8,

    /// Automatic color model when no key color is given
    #[arg(short, long, value_enum, default_value_t = Preset::Green)]
    preset: Preset,

    /// Exact background color to remove, as "r,g,b" or "#rrggbb"
    #[arg(short, long, conflicts_with = "pick")]
    key_color: Option<KeyColor>,

    /// Sample the key color at pixel "x,y" of the resized image
    #[arg(long, value_parser = parse_point)]
    pick: Option<(u32, u32)>,

    /// Longest edge kept before keying
    #[arg(long, default_value_t = chroma_cutout::geometry::DEFAULT_MAX_DIMENSION)]
    max_dimension: u32,

    /// Invert colors before keying (dark-background workflow)
    #[arg(long)]
    invert: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_point(s: &str) -> Result<(u32, u32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{s}\""))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid coordinate \"{v}\""))
    };
    Ok((coord(x)?, coord(y)?))
}

fn init_logger(opts: &ProcessOptions) {
    let level = if opts.quiet {
        LevelFilter::Error
    } else if opts.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let opts = ProcessOptions {
        threshold: cli.threshold,
        smoothing: cli.smoothing,
        key_color: cli.key_color,
        pick: cli.pick,
        preset: cli.preset,
        max_dimension: cli.max_dimension,
        invert: cli.invert,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    init_logger(&opts);

    let engine = match CutoutEngine::new(opts) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    let opts = engine.options();

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !opts.quiet {
        let params = engine.params();
        match (opts.key_color, opts.pick) {
            (Some(color), _) => eprintln!("Manual key color {color}"),
            (None, Some((x, y))) => eprintln!("Manual key color sampled at ({x}, {y})"),
            (None, None) => eprintln!(
                "Automatic {:?} keying ({})",
                opts.preset,
                opts.preset.key_color()
            ),
        }
        eprintln!(
            "Threshold {}, smoothing {}",
            params.threshold(),
            params.smoothing()
        );
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: chroma-cutout <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        eprintln!("[OK] {filename} ({:.0}% removed)", result.removed * 100.0);
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
