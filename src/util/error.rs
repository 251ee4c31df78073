//! Error types for spritewatch.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for spritewatch operations.
pub type SpriteWatchResult<T> = std::result::Result<T, SpriteWatchError>;

/// Errors that can occur while loading templates, matching, or driving the
/// capture pipeline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SpriteWatchError {
    /// A template file could not be read or decoded.
    #[error("failed to load template {}: {reason}", path.display())]
    TemplateLoad { path: PathBuf, reason: String },
    /// A template does not fit inside the frame it is matched against.
    #[error(
        "template {template} ({template_width}x{template_height}) is larger than the \
         {frame_width}x{frame_height} frame"
    )]
    TemplateSize {
        template: String,
        template_width: usize,
        template_height: usize,
        frame_width: usize,
        frame_height: usize,
    },
    /// A template carries no usable correlation signal.
    #[error("degenerate template {template}: {reason}")]
    DegenerateTemplate {
        template: String,
        reason: &'static str,
    },
    /// The frame source could not deliver a frame for this tick.
    #[error("capture failed: {reason}")]
    Capture { reason: String },
    /// A capture region update was rejected.
    #[error("invalid capture region: {reason}")]
    InvalidRegion { reason: &'static str },
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer is shorter than the declared dimensions require.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region of interest extends past the image bounds.
    #[error(
        "roi ({x}, {y}, {width}x{height}) is outside the {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The object class is not registered in the template library.
    #[error("unknown object class: {0}")]
    UnknownClass(String),
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl SpriteWatchError {
    /// Returns true for per-tick capture failures that the driver may retry.
    pub fn is_capture(&self) -> bool {
        matches!(self, SpriteWatchError::Capture { .. })
    }
}
