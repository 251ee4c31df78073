//! Frequency-domain cross-correlation.
//!
//! ΣTI for every placement at once: the frame spectrum times the template
//! spectrum taken with the opposite sign, transformed back. The transform
//! runs at the frame's own size; a placement where the template fits never
//! wraps around the edge, so no padding is needed.
//!
//! Every product sum is an integer below `255² · w · h`. The f64 round trip
//! stays orders of magnitude under half a unit for frames up to
//! [`MAX_SPECTRAL_PIXELS`], so rounding recovers the exact integer.

use crate::template::TemplatePlan;
use crate::ImageView;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

type C64 = Complex<f64>;

/// Frames above this many pixels always use the direct kernel.
pub const MAX_SPECTRAL_PIXELS: usize = 1 << 24;

/// Relative cost of one transform per frame pixel, in multiply-adds.
const TRANSFORM_COST: usize = 64;

/// Whether ΣTI is cheaper from one spectral pass than from direct windows.
pub fn prefers_spectral(frame_width: usize, frame_height: usize, plan: &TemplatePlan) -> bool {
    if frame_width < plan.width() || frame_height < plan.height() {
        return false;
    }
    let pixels = frame_width * frame_height;
    let placements = (frame_width - plan.width() + 1) * (frame_height - plan.height() + 1);
    pixels <= MAX_SPECTRAL_PIXELS
        && placements.saturating_mul(plan.len()) > pixels.saturating_mul(TRANSFORM_COST)
}

/// Exact ΣTI for every top-left placement of one template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DotSurface {
    width: usize,
    height: usize,
    dots: Vec<u64>,
}

impl DotSurface {
    /// Number of placement columns.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u64 {
        self.dots[y * self.width + x]
    }

    fn from_spatial(
        buf: &[C64],
        frame_width: usize,
        width: usize,
        height: usize,
        scale: f64,
        part: impl Fn(C64) -> f64,
    ) -> Self {
        let mut dots = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &buf[y * frame_width..y * frame_width + width];
            dots.extend(row.iter().map(|&c| (part(c) * scale).round().max(0.0) as u64));
        }
        Self {
            width,
            height,
            dots,
        }
    }
}

/// Separable 2-D transform over a `width × height` grid.
///
/// Spectra are stored column-major so the column pass runs on contiguous
/// memory; only the pointwise product ever touches them.
struct Fft2d {
    width: usize,
    height: usize,
    rows_fwd: Arc<dyn Fft<f64>>,
    rows_inv: Arc<dyn Fft<f64>>,
    cols_fwd: Arc<dyn Fft<f64>>,
    cols_inv: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            rows_fwd: planner.plan_fft_forward(width),
            rows_inv: planner.plan_fft_inverse(width),
            cols_fwd: planner.plan_fft_forward(height),
            cols_inv: planner.plan_fft_inverse(height),
        }
    }

    /// Row-major pixels to a column-major spectrum.
    fn spectrum(&self, mut buf: Vec<C64>, direction: FftDirection) -> Vec<C64> {
        let (rows, cols) = match direction {
            FftDirection::Forward => (&self.rows_fwd, &self.cols_fwd),
            FftDirection::Inverse => (&self.rows_inv, &self.cols_inv),
        };
        rows.process(&mut buf);
        let mut spec = transpose(&buf, self.width, self.height);
        cols.process(&mut spec);
        spec
    }

    /// Column-major spectrum back to row-major pixels (unnormalized).
    ///
    /// Only the first `rows` output rows are transformed.
    fn spatial(&self, mut spec: Vec<C64>, rows: usize) -> Vec<C64> {
        self.cols_inv.process(&mut spec);
        let mut buf = transpose(&spec, self.height, self.width);
        self.rows_inv.process(&mut buf[..rows * self.width]);
        buf
    }
}

fn transpose(src: &[C64], width: usize, height: usize) -> Vec<C64> {
    let mut out = vec![C64::default(); src.len()];
    for (y, row) in src.chunks_exact(width).enumerate() {
        for (x, &value) in row.iter().enumerate() {
            out[x * height + y] = value;
        }
    }
    out
}

/// Per-frame correlator holding the frame spectrum.
pub struct Correlator {
    fft: Fft2d,
    frame: Vec<C64>,
}

impl Correlator {
    pub fn new(image: ImageView<'_, u8>) -> Self {
        let fft = Fft2d::new(image.width(), image.height());
        let mut buf = Vec::with_capacity(image.width() * image.height());
        for y in 0..image.height() {
            if let Some(row) = image.row(y) {
                buf.extend(row.iter().map(|&v| C64::new(v as f64, 0.0)));
            }
        }
        let frame = fft.spectrum(buf, FftDirection::Forward);
        Self { fft, frame }
    }

    pub fn frame_width(&self) -> usize {
        self.fft.width
    }

    pub fn frame_height(&self) -> usize {
        self.fft.height
    }

    /// ΣTI surface for one template.
    pub fn dots(&self, plan: &TemplatePlan) -> DotSurface {
        let tpl = self.template_spectrum(plan);
        let product = self.frame.iter().zip(tpl.iter()).map(|(f, t)| f * t).collect();
        let (width, height) = self.placements(plan);
        let buf = self.fft.spatial(product, height);
        DotSurface::from_spatial(&buf, self.fft.width, width, height, self.scale(), |c| c.re)
    }

    /// ΣTI surfaces for two templates from one inverse transform.
    ///
    /// The frame is real, so correlating it with `a + i·b` yields `a`'s
    /// surface in the real part and `b`'s in the imaginary part.
    pub fn dots_pair(&self, a: &TemplatePlan, b: &TemplatePlan) -> (DotSurface, DotSurface) {
        let ta = self.template_spectrum(a);
        let tb = self.template_spectrum(b);
        let product = self
            .frame
            .iter()
            .zip(ta.iter().zip(tb.iter()))
            .map(|(f, (ta, tb))| f * C64::new(ta.re - tb.im, ta.im + tb.re))
            .collect();
        let (wa, ha) = self.placements(a);
        let (wb, hb) = self.placements(b);
        let buf = self.fft.spatial(product, ha.max(hb));
        let scale = self.scale();
        (
            DotSurface::from_spatial(&buf, self.fft.width, wa, ha, scale, |c| c.re),
            DotSurface::from_spatial(&buf, self.fft.width, wb, hb, scale, |c| c.im),
        )
    }

    fn placements(&self, plan: &TemplatePlan) -> (usize, usize) {
        (
            self.fft.width - plan.width() + 1,
            self.fft.height - plan.height() + 1,
        )
    }

    fn scale(&self) -> f64 {
        1.0 / (self.fft.width * self.fft.height) as f64
    }

    fn template_spectrum(&self, plan: &TemplatePlan) -> Arc<Vec<C64>> {
        let (width, height) = (self.fft.width, self.fft.height);
        plan.spectrum_cache().get_or_build(width, height, || {
            let mut buf = vec![C64::default(); width * height];
            for (ty, row) in plan.values().chunks_exact(plan.width()).enumerate() {
                for (tx, &value) in row.iter().enumerate() {
                    buf[ty * width + tx] = C64::new(value as f64, 0.0);
                }
            }
            self.fft.spectrum(buf, FftDirection::Inverse)
        })
    }
}

/// Template spectrum for the most recent frame size.
#[derive(Default)]
pub struct SpectrumCache(Mutex<Option<CachedSpectrum>>);

struct CachedSpectrum {
    width: usize,
    height: usize,
    spectrum: Arc<Vec<C64>>,
}

impl SpectrumCache {
    fn get_or_build(
        &self,
        width: usize,
        height: usize,
        build: impl FnOnce() -> Vec<C64>,
    ) -> Arc<Vec<C64>> {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = slot.as_ref() {
            if (cached.width, cached.height) == (width, height) {
                return Arc::clone(&cached.spectrum);
            }
        }
        let spectrum = Arc::new(build());
        *slot = Some(CachedSpectrum {
            width,
            height,
            spectrum: Arc::clone(&spectrum),
        });
        spectrum
    }

    fn cached_size(&self) -> Option<(usize, usize)> {
        let slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|c| (c.width, c.height))
    }
}

impl Clone for SpectrumCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl fmt::Debug for SpectrumCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumCache")
            .field("size", &self.cached_size())
            .finish()
    }
}
