//! In-memory frame source that replays prepared screens.

use crate::capture::{CaptureRegion, FrameSource};
use crate::image::Frame;
use crate::util::{SpriteWatchError, SpriteWatchResult};
use std::time::SystemTime;

/// Cycles through a fixed list of screen images, cropping the requested
/// region from the current one and advancing after every capture.
#[derive(Clone, Debug)]
pub struct ReplaySource {
    screens: Vec<Frame>,
    next: usize,
}

impl ReplaySource {
    pub fn new(screens: Vec<Frame>) -> Self {
        Self { screens, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}

impl FrameSource for ReplaySource {
    fn capture(&mut self, region: CaptureRegion) -> SpriteWatchResult<Frame> {
        if self.screens.is_empty() {
            return Err(SpriteWatchError::Capture {
                reason: "replay source has no screens".to_string(),
            });
        }
        let screen = &self.screens[self.next];
        self.next = (self.next + 1) % self.screens.len();

        if region.right() > screen.width() || region.bottom() > screen.height() {
            return Err(SpriteWatchError::Capture {
                reason: format!(
                    "region {}x{}+{}+{} lies outside the {}x{} screen",
                    region.width(),
                    region.height(),
                    region.left(),
                    region.top(),
                    screen.width(),
                    screen.height()
                ),
            });
        }
        let frame = screen
            .crop(region.left(), region.top(), region.width(), region.height())
            .map_err(|err| SpriteWatchError::Capture {
                reason: err.to_string(),
            })?;
        Ok(frame
            .with_timestamp(SystemTime::now())
            .with_region(region))
    }
}
