//! Primary-monitor capture through `xcap`.

use spritewatch::{
    CaptureRegion, Frame, FrameSource, PixelFormat, SpriteWatchError, SpriteWatchResult,
};

fn capture_error(reason: impl std::fmt::Display) -> SpriteWatchError {
    SpriteWatchError::Capture {
        reason: reason.to_string(),
    }
}

/// Grabs the primary monitor and crops the requested region.
pub struct ScreenSource {
    monitor: xcap::Monitor,
}

impl ScreenSource {
    pub fn primary() -> SpriteWatchResult<Self> {
        let monitors = xcap::Monitor::all()
            .map_err(|e| capture_error(format!("failed to enumerate monitors: {e}")))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary())
            .or_else(|| xcap::Monitor::all().ok()?.into_iter().next())
            .ok_or_else(|| capture_error("no monitors found"))?;
        Ok(Self { monitor })
    }
}

impl FrameSource for ScreenSource {
    fn capture(&mut self, region: CaptureRegion) -> SpriteWatchResult<Frame> {
        let img = self
            .monitor
            .capture_image()
            .map_err(|e| capture_error(format!("screen capture failed: {e}")))?;
        let (width, height) = (img.width() as usize, img.height() as usize);
        if region.right() > width || region.bottom() > height {
            return Err(capture_error(format!(
                "region {}x{}+{}+{} lies outside the {width}x{height} screen",
                region.width(),
                region.height(),
                region.left(),
                region.top()
            )));
        }
        let screen = Frame::new(img.into_raw(), width, height, PixelFormat::Rgba8)
            .map_err(capture_error)?;
        let frame = screen
            .crop(region.left(), region.top(), region.width(), region.height())
            .map_err(capture_error)?;
        Ok(frame.with_region(region))
    }
}
