//! Error types for the chroma-cutout crate.

/// Errors that can occur while preparing, keying, or saving an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input bytes or file could not be rasterized.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// A keying parameter is outside its accepted range.
    #[error("invalid {name}: {value} (expected {min}..={max})")]
    InvalidParameter {
        /// Parameter name as shown to the user.
        name: &'static str,
        /// The rejected value.
        value: i64,
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while encoding or saving an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Build an [`Error::InvalidParameter`] from any integer-like value.
    pub(crate) fn invalid(name: &'static str, value: impl Into<i64>, min: i64, max: i64) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
            min,
            max,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
