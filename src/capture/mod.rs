//! Capture regions and the frame source abstraction.

mod replay;

pub use replay::ReplaySource;

use crate::image::Frame;
use crate::library::TemplateLibrary;
use crate::util::{SpriteWatchError, SpriteWatchResult};
use std::sync::{Arc, PoisonError, RwLock};

/// Screen rectangle sampled every tick, in screen pixels.
///
/// Offsets are non-negative and sizes positive; [`CaptureRegion::new`] is the
/// only way to build one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptureRegion {
    top: usize,
    left: usize,
    width: usize,
    height: usize,
}

impl CaptureRegion {
    /// Validates signed user input into a region.
    pub fn new(top: i64, left: i64, width: i64, height: i64) -> SpriteWatchResult<Self> {
        if top < 0 || left < 0 {
            return Err(SpriteWatchError::InvalidRegion {
                reason: "offsets must be non-negative",
            });
        }
        if width <= 0 || height <= 0 {
            return Err(SpriteWatchError::InvalidRegion {
                reason: "width and height must be positive",
            });
        }
        let to_usize = |v: i64| {
            usize::try_from(v).map_err(|_| SpriteWatchError::InvalidRegion {
                reason: "value does not fit the platform word size",
            })
        };
        Ok(Self {
            top: to_usize(top)?,
            left: to_usize(left)?,
            width: to_usize(width)?,
            height: to_usize(height)?,
        })
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn left(&self) -> usize {
        self.left
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// One past the last screen column.
    pub fn right(&self) -> usize {
        self.left.saturating_add(self.width)
    }

    /// One past the last screen row.
    pub fn bottom(&self) -> usize {
        self.top.saturating_add(self.height)
    }

    /// The same size moved to a new top-left corner.
    pub fn with_offset(self, top: usize, left: usize) -> Self {
        Self { top, left, ..self }
    }
}

impl Default for CaptureRegion {
    /// 600x400 at top 300, left 600.
    fn default() -> Self {
        Self {
            top: 300,
            left: 600,
            width: 600,
            height: 400,
        }
    }
}

/// Size of the screen a region is positioned on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenBounds {
    pub width: usize,
    pub height: usize,
}

impl Default for ScreenBounds {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl ScreenBounds {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// True when `region` lies entirely on the screen.
    pub fn contains(&self, region: &CaptureRegion) -> bool {
        region.right() <= self.width && region.bottom() <= self.height
    }

    /// Maps slider percentages to a `(top, left)` offset.
    ///
    /// `left = width * x_pct / 100` and `top = height * y_pct / 100`;
    /// percentages above 100 are clamped.
    pub fn offset_from_percent(&self, x_pct: u32, y_pct: u32) -> (usize, usize) {
        let x_pct = x_pct.min(100) as usize;
        let y_pct = y_pct.min(100) as usize;
        (self.height * y_pct / 100, self.width * x_pct / 100)
    }
}

/// A capture backend.
///
/// `capture` returns a frame exactly `region.width() x region.height()` in
/// size, or a `Capture` error when the region is off screen or the backend is
/// unavailable. Backends that can block must bound their own wait.
pub trait FrameSource {
    fn capture(&mut self, region: CaptureRegion) -> SpriteWatchResult<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self, region: CaptureRegion) -> SpriteWatchResult<Frame> {
        (**self).capture(region)
    }
}

/// Shared, validated capture region.
///
/// Settings code calls [`RegionHandle::set`] from any thread; the driver reads
/// a whole copy at the start of each tick.
#[derive(Clone, Debug)]
pub struct RegionHandle {
    region: Arc<RwLock<CaptureRegion>>,
    library: Arc<TemplateLibrary>,
}

impl RegionHandle {
    pub(crate) fn new(region: CaptureRegion, library: Arc<TemplateLibrary>) -> Self {
        Self {
            region: Arc::new(RwLock::new(region)),
            library,
        }
    }

    /// Current region.
    pub fn get(&self) -> CaptureRegion {
        *self.region.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the region, rejecting one smaller than the largest template.
    pub fn set(&self, region: CaptureRegion) -> SpriteWatchResult<()> {
        self.library.check_fits(region.width(), region.height())?;
        *self.region.write().unwrap_or_else(PoisonError::into_inner) = region;
        Ok(())
    }
}
