use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::Serialize;
use spritewatch::{
    Detection, DrawSwitch, Frame, FrameSink, ObjectClass, PixelFormat, RenderStyle, StopCause,
    TemplateLibrary,
};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::time::UNIX_EPOCH;

#[derive(Debug, Serialize)]
struct RegionRecord {
    top: usize,
    left: usize,
    width: usize,
    height: usize,
}

#[derive(Debug, Serialize)]
struct DetectionRecord<'a> {
    class: &'a str,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    confidence: f32,
    template: &'a str,
}

impl<'a> From<&'a Detection> for DetectionRecord<'a> {
    fn from(value: &'a Detection) -> Self {
        Self {
            class: value.class.as_str(),
            x: value.bbox.x,
            y: value.bbox.y,
            width: value.bbox.width,
            height: value.bbox.height,
            confidence: value.confidence,
            template: &value.template,
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameRecord<'a> {
    frame: u64,
    timestamp_ms: u128,
    region: Option<RegionRecord>,
    detections: Vec<DetectionRecord<'a>>,
}

/// Prints one JSON line per frame and optionally writes annotated PNGs.
pub struct ReportSink {
    draw: DrawSwitch,
    output_dir: Option<PathBuf>,
    styles: HashMap<ObjectClass, RenderStyle>,
    frames: u64,
    limit: Option<(u64, Sender<()>)>,
    stop_reported: bool,
}

impl ReportSink {
    pub fn new(library: &TemplateLibrary, draw: DrawSwitch, output_dir: Option<PathBuf>) -> Self {
        let styles = library
            .classes()
            .map(|spec| (spec.class.clone(), spec.style))
            .collect();
        Self {
            draw,
            output_dir,
            styles,
            frames: 0,
            limit: None,
            stop_reported: false,
        }
    }

    /// Sends a stop request once `max_frames` frames have been reported.
    pub fn with_limit(mut self, max_frames: u64, stop_tx: Sender<()>) -> Self {
        self.limit = Some((max_frames, stop_tx));
        self
    }

    /// The stop line for `cause`, or `None` if a stop was already reported.
    pub fn stop_line(&mut self, cause: &StopCause) -> Option<String> {
        if std::mem::replace(&mut self.stop_reported, true) {
            return None;
        }
        Some(format!("detection stopped: {cause}"))
    }

    fn annotate(&self, frame: &Frame, detections: &[Detection]) -> Result<(), String> {
        let Some(dir) = &self.output_dir else {
            return Ok(());
        };
        let mut canvas = to_rgb(frame).ok_or("frame buffer does not match its size")?;
        for det in detections {
            let style = self.styles.get(&det.class).copied().unwrap_or_default();
            let color = Rgb(style.color);
            for inset in 0..style.thickness {
                let inset_px = inset as usize;
                if det.bbox.width <= 2 * inset_px || det.bbox.height <= 2 * inset_px {
                    break;
                }
                let rect = Rect::at((det.bbox.x + inset_px) as i32, (det.bbox.y + inset_px) as i32)
                    .of_size(
                        (det.bbox.width - 2 * inset_px) as u32,
                        (det.bbox.height - 2 * inset_px) as u32,
                    );
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }
        std::fs::create_dir_all(dir).map_err(|err| err.to_string())?;
        let path = dir.join(format!("frame_{:06}.png", self.frames));
        canvas.save(&path).map_err(|err| err.to_string())
    }
}

impl FrameSink for ReportSink {
    fn on_frame(&mut self, frame: &Frame, detections: &[Detection]) {
        let timestamp_ms = frame
            .captured_at()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let record = FrameRecord {
            frame: self.frames,
            timestamp_ms,
            region: frame.region().map(|r| RegionRecord {
                top: r.top(),
                left: r.left(),
                width: r.width(),
                height: r.height(),
            }),
            detections: detections.iter().map(DetectionRecord::from).collect(),
        };
        match serde_json::to_string(&record) {
            Ok(line) => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{line}");
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize frame record"),
        }

        if self.draw.is_enabled() {
            if let Err(err) = self.annotate(frame, detections) {
                tracing::warn!(error = %err, "failed to write annotated frame");
            }
        }

        self.frames += 1;
        if let Some((max_frames, stop_tx)) = &self.limit {
            if self.frames >= *max_frames {
                let _ = stop_tx.send(());
            }
        }
    }

    fn on_stopped(&mut self, cause: &StopCause) {
        if let Some(line) = self.stop_line(cause) {
            eprintln!("{line}");
        }
    }
}

fn to_rgb(frame: &Frame) -> Option<RgbImage> {
    let data = frame.data();
    let rgb: Vec<u8> = match frame.format() {
        PixelFormat::Gray8 => data.iter().flat_map(|&v| [v, v, v]).collect(),
        PixelFormat::Rgb8 => data.to_vec(),
        PixelFormat::Rgba8 => data
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        PixelFormat::Bgra8 => data
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
    };
    RgbImage::from_raw(frame.width() as u32, frame.height() as u32, rgb)
}
