//! SpriteWatch is a CPU-first live sprite detector.
//!
//! It samples a rectangle of the screen at a fixed cadence, matches every
//! reference template of a fixed library against each frame with normalized
//! cross-correlation, and reports one deduplicated detection per object per
//! class. Optional features add parallel scans (`rayon`), an 8-lane integer
//! kernel (`simd`), image file loading (`image-io`) and `tracing` spans.
//!
//! ```no_run
//! use spritewatch::{
//!     CaptureRegion, ClassSpec, DriverConfig, Frame, GrayImage, PipelineDriver, ReplaySource,
//!     TemplateLibrary, TemplateSource,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> spritewatch::SpriteWatchResult<()> {
//! let sprite = GrayImage::filled(32, 32, 255)?;
//! let library = TemplateLibrary::builder()
//!     .class(ClassSpec::new("runner"), vec![TemplateSource::new("run", sprite)])
//!     .build()?;
//! let screen = Frame::from_gray(&GrayImage::filled(1920, 1080, 0)?);
//! let mut driver = PipelineDriver::new(
//!     ReplaySource::new(vec![screen]),
//!     Arc::new(library),
//!     DriverConfig::default(),
//! )?;
//! driver.start(CaptureRegion::default())?;
//! # Ok(())
//! # }
//! ```

mod candidate;
pub mod capture;
pub mod detect;
pub mod image;
pub mod kernel;
pub mod library;
pub mod matcher;
pub mod pipeline;
pub mod template;
mod trace;
pub mod util;

pub use candidate::nms::suppress_overlaps;
pub use candidate::topk::{Peak, TopK};
pub use candidate::{BoundingBox, MatchCandidate};
pub use capture::{CaptureRegion, FrameSource, RegionHandle, ReplaySource, ScreenBounds};
pub use detect::{AggregatorConfig, Detection, DetectionAggregator};
pub use image::{luma, Frame, GrayImage, ImageView, PixelFormat};
pub use kernel::{DotSurface, Kernel, PreparedFrame, ScanParams, WindowSums};
#[cfg(feature = "image-io")]
pub use library::ClassSource;
pub use library::{ClassSpec, LibraryBuilder, RenderStyle, TemplateLibrary, TemplateSource};
pub use matcher::{MatchConfig, MatchMode, Matcher, Metric, ResponseMap};
pub use pipeline::{
    spawn, DrawSwitch, DriverConfig, DriverHandle, DriverState, FrameSink, PipelineDriver,
    StopCause, TickOutcome,
};
pub use template::{ObjectClass, Template, TemplatePlan};
pub use util::{SpriteWatchError, SpriteWatchResult};
