//! Interactive keying session with stale-result discard.
//!
//! Every parameter change issues a new [`PassTicket`]. A pass can run on any
//! thread, but only the result of the most recent ticket is ever committed;
//! anything older is dropped instead of overwriting a newer cutout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::alpha::KeyParams;
use crate::engine;
use crate::error::Result;
use crate::key::Mode;

/// Delay callers can use to coalesce rapid slider drags into one pass.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// A request to key the session's source with specific parameters.
///
/// Tickets are cheap to clone and can be moved to worker threads.
#[derive(Debug, Clone)]
pub struct PassTicket {
    generation: u64,
    mode: Mode,
    params: KeyParams,
    source: Arc<RgbaImage>,
    latest: Arc<AtomicU64>,
}

impl PassTicket {
    /// Request number; later requests have larger numbers.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The keying mode of this request.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The threshold/smoothing pair of this request.
    #[must_use]
    pub fn params(&self) -> KeyParams {
        self.params
    }

    /// Whether a newer request has been issued since this one.
    ///
    /// Workers can check this before starting to skip work that would be
    /// discarded anyway.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.generation != self.latest.load(Ordering::Acquire)
    }

    /// Key the source. Touches no session state.
    #[must_use]
    pub fn run(&self) -> RgbaImage {
        engine::apply(&self.source, self.mode, self.params)
    }
}

/// Holds one prepared source image and the last committed cutout.
#[derive(Debug)]
pub struct Session {
    source: Arc<RgbaImage>,
    latest: Arc<AtomicU64>,
    current: Option<(u64, RgbaImage)>,
}

impl Session {
    /// Start a session from a freshly decoded image, normalizing it once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidParameter`] if `max_dimension` is zero.
    pub fn new(raw: RgbaImage, max_dimension: u32, invert: bool) -> Result<Self> {
        let prepared = engine::prepare(raw, max_dimension, invert)?;
        Ok(Self::from_prepared(prepared))
    }

    /// Start a session from an already prepared raster.
    #[must_use]
    pub fn from_prepared(source: RgbaImage) -> Self {
        Self {
            source: Arc::new(source),
            latest: Arc::new(AtomicU64::new(0)),
            current: None,
        }
    }

    /// The prepared source image every pass reads from.
    #[must_use]
    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// Issue a ticket for new parameters, superseding all earlier tickets.
    #[must_use]
    pub fn request(&self, mode: Mode, params: KeyParams) -> PassTicket {
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        PassTicket {
            generation,
            mode,
            params,
            source: Arc::clone(&self.source),
            latest: Arc::clone(&self.latest),
        }
    }

    /// Whether `ticket` is still the most recent request.
    #[must_use]
    pub fn is_current(&self, ticket: &PassTicket) -> bool {
        ticket.generation == self.latest.load(Ordering::Acquire)
    }

    /// Install `result` if `ticket` is still current.
    ///
    /// Returns `false` and drops the result when a newer ticket exists; the
    /// previously committed cutout stays in place.
    pub fn commit(&mut self, ticket: &PassTicket, result: RgbaImage) -> bool {
        if !self.is_current(ticket) {
            log::debug!(
                "Discarding stale pass {} (latest is {})",
                ticket.generation,
                self.latest.load(Ordering::Acquire)
            );
            return false;
        }
        self.current = Some((ticket.generation, result));
        true
    }

    /// Request, run and commit in one step on the calling thread.
    pub fn rerun(&mut self, mode: Mode, params: KeyParams) -> &RgbaImage {
        let ticket = self.request(mode, params);
        let result = ticket.run();
        &self.current.insert((ticket.generation, result)).1
    }

    /// The last committed cutout, if any.
    #[must_use]
    pub fn current(&self) -> Option<&RgbaImage> {
        self.current.as_ref().map(|(_, img)| img)
    }

    /// Generation of the last committed cutout, if any.
    #[must_use]
    pub fn current_generation(&self) -> Option<u64> {
        self.current.as_ref().map(|(generation, _)| *generation)
    }

    /// Drop the committed cutout and invalidate all outstanding tickets.
    pub fn reset(&mut self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
        self.current = None;
    }
}
