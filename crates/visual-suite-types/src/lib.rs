//! Shared domain models for the visual-suite workspace.
//!
//! This crate centralizes the data structures passed between the retriever,
//! comparator and suite crates: the decoded image handle, the perception
//! thresholds and the read-only comparison outcome. Keep it free of I/O so
//! every crate can depend on it without pulling runtime dependencies.

use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use thiserror::Error;

pub mod perception;
pub mod result;

pub use perception::{Amount, AmountType, AmountValue, Perception, PixelClass};
pub use result::{Area, ComparisonResult, Point, Rectangle};

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Decoded RGBA image shared between the tasks that consume it.
///
/// Cloning is cheap; every clone points at the same pixel buffer.
#[derive(Clone)]
pub struct SuiteImage {
    pixels: Arc<RgbaImage>,
}

impl fmt::Debug for SuiteImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bytes", &self.pixels.as_raw().len())
            .finish()
    }
}

impl SuiteImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::from_rgba(decoded.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Returns `None` for coordinates outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x < self.width() && y < self.height() {
            Some(*self.pixels.get_pixel(x, y))
        } else {
            None
        }
    }

    /// True when both handles share one pixel buffer.
    pub fn ptr_eq(&self, other: &SuiteImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

/// Failure while fetching or decoding a pattern, mask or sample.
///
/// The error is `Clone` so a single failed retrieval can be handed to every
/// caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("source '{source_id}' was not found")]
    NotFound { source_id: String },

    #[error("invalid source '{source_id}': {reason}")]
    InvalidSource { source_id: String, reason: String },

    #[error("failed to read '{source_id}': {cause}")]
    Io {
        source_id: String,
        #[source]
        cause: Arc<std::io::Error>,
    },

    #[error("failed to decode '{source_id}': {cause}")]
    Decode {
        source_id: String,
        #[source]
        cause: Arc<image::ImageError>,
    },

    #[error("retrieval of '{source_id}' did not complete: {reason}")]
    Interrupted { source_id: String, reason: String },
}

impl RetrievalError {
    pub fn not_found(source_id: impl Into<String>) -> Self {
        Self::NotFound {
            source_id: source_id.into(),
        }
    }

    pub fn invalid_source(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    pub fn io(source_id: impl Into<String>, cause: std::io::Error) -> Self {
        Self::Io {
            source_id: source_id.into(),
            cause: Arc::new(cause),
        }
    }

    pub fn decode(source_id: impl Into<String>, cause: image::ImageError) -> Self {
        Self::Decode {
            source_id: source_id.into(),
            cause: Arc::new(cause),
        }
    }

    pub fn interrupted(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Interrupted {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            Self::NotFound { source_id }
            | Self::InvalidSource { source_id, .. }
            | Self::Io { source_id, .. }
            | Self::Decode { source_id, .. }
            | Self::Interrupted { source_id, .. } => source_id,
        }
    }
}
