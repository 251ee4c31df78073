//! The live capture loop and its sink-side interfaces.
//!
//! A [`PipelineDriver`] owns a frame source and, once started, turns each
//! tick into one capture, one grayscale reduction and one aggregation. The
//! detections and the frame go to a [`FrameSink`]; failures never reach the
//! sink as errors.

mod driver;

pub use driver::{spawn, DriverConfig, DriverHandle, DriverState, PipelineDriver};

use crate::detect::Detection;
use crate::image::Frame;
use crate::util::SpriteWatchError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a running driver went back to idle.
#[derive(Clone, Debug, PartialEq)]
pub enum StopCause {
    /// `stop` was called or a stop signal arrived.
    Requested,
    /// The frame source failed on `consecutive` ticks in a row.
    CaptureFailures {
        consecutive: usize,
        last: SpriteWatchError,
    },
    /// A tick failed for a reason other than capture.
    Fatal(SpriteWatchError),
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Requested => f.write_str("stop requested"),
            StopCause::CaptureFailures { consecutive, last } => {
                write!(f, "{consecutive} consecutive capture failures, last: {last}")
            }
            StopCause::Fatal(err) => write!(f, "fatal tick error: {err}"),
        }
    }
}

/// Result of one [`PipelineDriver::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The driver is not running; nothing was captured.
    Idle,
    /// The sink received the frame and these detections.
    Delivered { detections: Vec<Detection> },
    /// Capture failed; the sink was not called.
    Skipped { consecutive: usize },
    /// This tick moved the driver to idle.
    Stopped(StopCause),
}

/// Consumer of per-tick results, typically a renderer or logger.
pub trait FrameSink {
    /// Called once per successful tick.
    fn on_frame(&mut self, frame: &Frame, detections: &[Detection]);

    /// Called once when the driver stops because of a failure.
    fn on_stopped(&mut self, _cause: &StopCause) {}
}

impl<K: FrameSink + ?Sized> FrameSink for &mut K {
    fn on_frame(&mut self, frame: &Frame, detections: &[Detection]) {
        (**self).on_frame(frame, detections)
    }

    fn on_stopped(&mut self, cause: &StopCause) {
        (**self).on_stopped(cause)
    }
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn on_frame(&mut self, frame: &Frame, detections: &[Detection]) {
        (**self).on_frame(frame, detections)
    }

    fn on_stopped(&mut self, cause: &StopCause) {
        (**self).on_stopped(cause)
    }
}

/// Shared flag telling a sink whether to draw outlines.
///
/// Detection runs the same either way.
#[derive(Clone, Debug, Default)]
pub struct DrawSwitch(Arc<AtomicBool>);

impl DrawSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::DrawSwitch;

    #[test]
    fn draw_switch_is_shared() {
        let switch = DrawSwitch::new(true);
        let other = switch.clone();
        other.set(false);
        assert!(!switch.is_enabled());
    }
}
