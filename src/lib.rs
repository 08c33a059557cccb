//! Interactive chroma-key background removal.
//!
//! An external isolation step repaints a photo's background as flat green
//! (`#00FF00`) or magenta (`#FF00FF`). This crate turns that keyed image into
//! a cutout: every pixel gets a background-likeness score, the score becomes
//! alpha through an anti-aliased ramp, and key-color spill is removed from the
//! retained edges. The pass is cheap and deterministic, so it can be re-run on
//! every slider change.
//!
//! # Quick Start
//!
//! ```no_run
//! use chroma_cutout::{apply, KeyParams, Mode, Preset};
//!
//! let raw = chroma_cutout::raster::open("keyed.png".as_ref()).expect("decode");
//! let source = chroma_cutout::prepare(raw, 1536, false).expect("prepare");
//! let mode = Mode::select(None, Preset::Green);
//! let cutout = apply(&source, mode, KeyParams::default());
//! chroma_cutout::save_image(&cutout, "cutout.png".as_ref()).unwrap();
//! ```
//!
//! # Live tuning
//!
//! A [`Session`] owns the prepared source and hands out [`PassTicket`]s.
//! Results from superseded tickets are discarded instead of committed.
//! Waiting [`DEFAULT_DEBOUNCE`] before running lets a slider drag collapse
//! into a single pass.
//!
//! ```no_run
//! use chroma_cutout::{KeyParams, Mode, Session, DEFAULT_DEBOUNCE};
//!
//! # let raw = image::RgbaImage::new(1, 1);
//! let mut session = Session::new(raw, 1536, false).expect("prepare");
//! let ticket = session.request(Mode::AutoGreen, KeyParams::new(20, 10).unwrap());
//! std::thread::sleep(DEFAULT_DEBOUNCE);
//! if !ticket.is_stale() {
//!     let result = ticket.run();
//!     session.commit(&ticket, result);
//! }
//! ```

#![deny(missing_docs)]

pub mod alpha;
pub mod despill;
mod engine;
pub mod error;
pub mod geometry;
pub mod key;
pub mod raster;
mod session;
pub mod tone;

pub use alpha::KeyParams;
pub use engine::{
    apply, apply_in_place, default_output_path, is_supported_image, prepare, save_image,
    transparent_fraction, CutoutEngine, ProcessOptions, ProcessResult,
};
pub use error::{Error, Result};
pub use key::{KeyColor, Mode, Preset};
pub use session::{PassTicket, Session, DEFAULT_DEBOUNCE};
