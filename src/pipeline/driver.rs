//! Fixed-period capture loop.

use crate::capture::{CaptureRegion, FrameSource, RegionHandle};
use crate::detect::{AggregatorConfig, Detection, DetectionAggregator};
use crate::image::Frame;
use crate::library::TemplateLibrary;
use crate::pipeline::{FrameSink, StopCause, TickOutcome};
use crate::trace::{trace_error, trace_event, trace_span, trace_warn};
use crate::util::{SpriteWatchError, SpriteWatchResult};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lifecycle state of a [`PipelineDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
}

/// Configuration for the driver loop.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Target time between tick starts.
    pub period: Duration,
    /// Consecutive capture failures that stop the driver (at least 1).
    pub max_consecutive_failures: usize,
    pub aggregator: AggregatorConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(30),
            max_consecutive_failures: 3,
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// Orchestrates capture, grayscale reduction, aggregation and delivery.
pub struct PipelineDriver<S> {
    source: S,
    library: Arc<TemplateLibrary>,
    aggregator: DetectionAggregator,
    region: RegionHandle,
    period: Duration,
    max_failures: usize,
    state: DriverState,
    failures: usize,
}

impl<S: FrameSource> PipelineDriver<S> {
    /// Creates an idle driver.
    pub fn new(
        source: S,
        library: Arc<TemplateLibrary>,
        cfg: DriverConfig,
    ) -> SpriteWatchResult<Self> {
        let aggregator = DetectionAggregator::new(cfg.aggregator)?;
        Ok(Self {
            source,
            region: RegionHandle::new(CaptureRegion::default(), Arc::clone(&library)),
            library,
            aggregator,
            period: cfg.period,
            max_failures: cfg.max_consecutive_failures.max(1),
            state: DriverState::Idle,
            failures: 0,
        })
    }

    /// Handle for updating the capture region from other threads.
    pub fn region_handle(&self) -> RegionHandle {
        self.region.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Validates `region` against the library and enters `Running`.
    pub fn start(&mut self, region: CaptureRegion) -> SpriteWatchResult<()> {
        if self.state == DriverState::Running {
            return Err(SpriteWatchError::InvalidInput("driver is already running"));
        }
        self.region.set(region)?;
        self.failures = 0;
        self.state = DriverState::Running;
        trace_event!(
            "driver_started",
            width = region.width(),
            height = region.height()
        );
        Ok(())
    }

    /// Returns to `Idle`; `None` when the driver was not running.
    pub fn stop(&mut self) -> Option<StopCause> {
        if self.state == DriverState::Idle {
            return None;
        }
        self.state = DriverState::Idle;
        self.failures = 0;
        Some(StopCause::Requested)
    }

    /// Runs one capture-and-detect cycle.
    pub fn tick<K: FrameSink + ?Sized>(&mut self, sink: &mut K) -> TickOutcome {
        if self.state == DriverState::Idle {
            return TickOutcome::Idle;
        }
        let _span = trace_span!("tick").entered();
        let region = self.region.get();

        match self.process(region) {
            Ok((frame, detections)) => {
                self.failures = 0;
                sink.on_frame(&frame, &detections);
                TickOutcome::Delivered { detections }
            }
            Err(err) if err.is_capture() => {
                self.failures += 1;
                if self.failures >= self.max_failures {
                    let cause = StopCause::CaptureFailures {
                        consecutive: self.failures,
                        last: err,
                    };
                    self.halt(sink, cause)
                } else {
                    trace_warn!(consecutive = self.failures, error = %err, "frame skipped");
                    TickOutcome::Skipped {
                        consecutive: self.failures,
                    }
                }
            }
            Err(err) => self.halt(sink, StopCause::Fatal(err)),
        }
    }

    /// Ticks every `period` until stopped.
    ///
    /// A message on `stop_rx`, or its sender hanging up, is seen between ticks
    /// and ends the loop with [`StopCause::Requested`]. A tick that overruns
    /// the period is followed immediately by the next one; missed ticks are
    /// not replayed.
    pub fn run<K: FrameSink + ?Sized>(
        &mut self,
        sink: &mut K,
        stop_rx: &Receiver<()>,
    ) -> SpriteWatchResult<StopCause> {
        if self.state == DriverState::Idle {
            return Err(SpriteWatchError::InvalidInput("driver is not running"));
        }
        loop {
            let started = Instant::now();
            if let TickOutcome::Stopped(cause) = self.tick(sink) {
                return Ok(cause);
            }
            let wait = self.period.saturating_sub(started.elapsed());
            match stop_rx.recv_timeout(wait) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    self.stop();
                    return Ok(StopCause::Requested);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    fn process(&mut self, region: CaptureRegion) -> SpriteWatchResult<(Frame, Vec<Detection>)> {
        let frame = self.source.capture(region)?;
        if frame.width() != region.width() || frame.height() != region.height() {
            return Err(SpriteWatchError::Capture {
                reason: format!(
                    "source returned {}x{} for a {}x{} region",
                    frame.width(),
                    frame.height(),
                    region.width(),
                    region.height()
                ),
            });
        }
        let gray = frame.to_gray();
        let detections = self.aggregator.aggregate(gray.view(), &self.library)?;
        Ok((frame, detections))
    }

    fn halt<K: FrameSink + ?Sized>(&mut self, sink: &mut K, cause: StopCause) -> TickOutcome {
        self.state = DriverState::Idle;
        self.failures = 0;
        trace_error!(cause = %cause, "capture pipeline stopped");
        sink.on_stopped(&cause);
        TickOutcome::Stopped(cause)
    }
}

/// Owner side of a driver running on its own thread.
///
/// Dropping the handle without calling [`DriverHandle::stop`] or
/// [`DriverHandle::join`] also stops the driver after its current tick.
pub struct DriverHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<SpriteWatchResult<StopCause>>,
}

impl DriverHandle {
    /// Requests a stop, waits for the in-flight tick and returns the cause.
    pub fn stop(self) -> SpriteWatchResult<StopCause> {
        // The driver may already have stopped on its own.
        let _ = self.stop_tx.send(());
        self.join()
    }

    /// Waits for the driver to stop on its own.
    pub fn join(self) -> SpriteWatchResult<StopCause> {
        let Self { stop_tx, thread } = self;
        let joined = thread.join();
        drop(stop_tx);
        joined.map_err(|_| SpriteWatchError::InvalidInput("driver thread panicked"))?
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Runs a started driver on a thread named `spritewatch-driver`.
pub fn spawn<S, K>(mut driver: PipelineDriver<S>, mut sink: K) -> SpriteWatchResult<DriverHandle>
where
    S: FrameSource + Send + 'static,
    K: FrameSink + Send + 'static,
{
    if driver.state() == DriverState::Idle {
        return Err(SpriteWatchError::InvalidInput("driver is not running"));
    }
    let (stop_tx, stop_rx) = mpsc::channel();
    let thread = thread::Builder::new()
        .name("spritewatch-driver".to_string())
        .spawn(move || driver.run(&mut sink, &stop_rx))
        .map_err(|_| SpriteWatchError::InvalidInput("failed to spawn driver thread"))?;
    Ok(DriverHandle { stop_tx, thread })
}

#[cfg(test)]
mod tests {
    use super::{DriverConfig, DriverState, PipelineDriver};
    use crate::capture::{CaptureRegion, FrameSource};
    use crate::detect::Detection;
    use crate::image::{Frame, GrayImage};
    use crate::library::{ClassSpec, TemplateLibrary, TemplateSource};
    use crate::pipeline::{FrameSink, StopCause, TickOutcome};
    use crate::util::{SpriteWatchError, SpriteWatchResult};
    use std::sync::Arc;

    struct WrongSize;

    impl FrameSource for WrongSize {
        fn capture(&mut self, _region: CaptureRegion) -> SpriteWatchResult<Frame> {
            GrayImage::filled(5, 5, 0).map(|img| Frame::from_gray(&img))
        }
    }

    struct Count(usize);

    impl FrameSink for Count {
        fn on_frame(&mut self, _frame: &Frame, _detections: &[Detection]) {
            self.0 += 1;
        }
    }

    fn library() -> Arc<TemplateLibrary> {
        let lib = TemplateLibrary::builder()
            .class(
                ClassSpec::new("runner"),
                vec![TemplateSource::new(
                    "run",
                    GrayImage::filled(4, 4, 200).unwrap(),
                )],
            )
            .build()
            .unwrap();
        Arc::new(lib)
    }

    #[test]
    fn mismatched_frame_size_counts_as_capture_failure() {
        let cfg = DriverConfig {
            max_consecutive_failures: 0,
            ..DriverConfig::default()
        };
        let mut driver = PipelineDriver::new(WrongSize, library(), cfg).unwrap();
        driver.start(CaptureRegion::new(0, 0, 20, 20).unwrap()).unwrap();
        let mut sink = Count(0);
        match driver.tick(&mut sink) {
            TickOutcome::Stopped(StopCause::CaptureFailures { consecutive, last }) => {
                assert_eq!(consecutive, 1);
                assert!(last.is_capture());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(sink.0, 0);
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn start_rejects_region_smaller_than_templates() {
        let mut driver =
            PipelineDriver::new(WrongSize, library(), DriverConfig::default()).unwrap();
        let err = driver
            .start(CaptureRegion::new(0, 0, 3, 10).unwrap())
            .unwrap_err();
        assert!(matches!(err, SpriteWatchError::TemplateSize { .. }));
        assert_eq!(driver.state(), DriverState::Idle);
        assert_eq!(driver.tick(&mut Count(0)), TickOutcome::Idle);
    }
}
