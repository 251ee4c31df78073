//! Correlation kernel implementations.
//!
//! Scoring one placement needs three exact sums over its window. ΣI and ΣI²
//! come from [`IntegralSums`] in constant time. ΣTI comes either from a
//! direct [`Kernel`] pass over the window, used for templates too small to
//! amortize a transform, or from a [`DotSurface`] computed for every
//! placement at once. Both produce the same integers, and turning sums into a
//! score is shared through [`TemplatePlan::score`], so every path yields
//! bit-identical scores.

use crate::candidate::topk::{Peak, PeakCollector};
use crate::matcher::Metric;
use crate::template::TemplatePlan;
use crate::util::{SpriteWatchError, SpriteWatchResult};
use crate::ImageView;
use std::sync::OnceLock;

pub mod integral;
pub mod scalar;
pub mod spectral;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

pub use integral::IntegralSums;
pub use spectral::{Correlator, DotSurface};

/// Exact sums over one template-sized window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowSums {
    /// Sum of image intensities.
    pub sum_i: u64,
    /// Sum of squared image intensities.
    pub sum_i2: u64,
    /// Sum of template-times-image products.
    pub dot: u64,
}

/// Scan configuration for kernel evaluations.
#[derive(Clone, Copy, Debug)]
pub struct ScanParams {
    pub metric: Metric,
    /// Keep only the best `k` peaks; `None` keeps every peak.
    pub limit: Option<usize>,
    /// Per-pixel window variance (`Zncc`) or mean square (`Ncc`) at or below
    /// which a placement is skipped.
    pub min_var_i: f32,
    pub min_score: f32,
}

/// Direct window accumulation.
pub trait Kernel {
    /// Accumulates sums for the placement with top-left corner `(x, y)`.
    ///
    /// The caller guarantees that the template fits at `(x, y)`.
    fn window_sums(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> WindowSums;
}

/// A grayscale frame with the lookup tables every template scan shares.
///
/// Build one per frame and reuse it for all templates; the frame spectrum is
/// computed on first use.
pub struct PreparedFrame<'a> {
    view: ImageView<'a, u8>,
    integral: IntegralSums,
    correlator: OnceLock<Correlator>,
}

impl<'a> PreparedFrame<'a> {
    pub fn new(view: ImageView<'a, u8>) -> Self {
        Self {
            integral: IntegralSums::new(view),
            view,
            correlator: OnceLock::new(),
        }
    }

    pub fn view(&self) -> ImageView<'a, u8> {
        self.view
    }

    pub fn width(&self) -> usize {
        self.view.width()
    }

    pub fn height(&self) -> usize {
        self.view.height()
    }

    pub fn integral(&self) -> &IntegralSums {
        &self.integral
    }

    pub fn correlator(&self) -> &Correlator {
        self.correlator.get_or_init(|| Correlator::new(self.view))
    }

    /// Whether `plan` should take its ΣTI from a [`DotSurface`] on this frame.
    pub fn prefers_spectral(&self, plan: &TemplatePlan) -> bool {
        spectral::prefers_spectral(self.width(), self.height(), plan)
    }
}

/// Where ΣTI comes from during a scan.
#[derive(Clone, Copy, Debug)]
pub enum DotSource<'s> {
    Direct,
    Surface(&'s DotSurface),
}

/// Exact sums for the placement at `(x, y)`.
#[inline]
pub fn sums_at<K: Kernel + ?Sized>(
    frame: &PreparedFrame<'_>,
    plan: &TemplatePlan,
    dots: DotSource<'_>,
    x: usize,
    y: usize,
) -> WindowSums {
    match dots {
        DotSource::Direct => K::window_sums(frame.view, plan, x, y),
        DotSource::Surface(surface) => {
            let (sum_i, sum_i2) = frame.integral.window(x, y, plan.width(), plan.height());
            WindowSums {
                sum_i,
                sum_i2,
                dot: surface.get(x, y),
            }
        }
    }
}

/// Scans every valid placement and returns peaks at or above
/// `params.min_score`, sorted by descending score.
pub fn scan_full<K: Kernel + ?Sized>(
    frame: &PreparedFrame<'_>,
    plan: &TemplatePlan,
    dots: DotSource<'_>,
    params: ScanParams,
) -> SpriteWatchResult<Vec<Peak>> {
    let (max_x, max_y) = placement_range(frame.view, plan)?;
    let mut peaks = PeakCollector::new(params.limit);
    for y in 0..=max_y {
        scan_row::<K>(frame, plan, dots, y, max_x, params, |peak| peaks.push(peak));
    }
    Ok(peaks.into_sorted_desc())
}

/// Scores of one response row; cells without a score hold `NEG_INFINITY`.
pub fn response_row<K: Kernel + ?Sized>(
    frame: &PreparedFrame<'_>,
    plan: &TemplatePlan,
    dots: DotSource<'_>,
    y: usize,
    max_x: usize,
    metric: Metric,
    min_var_i: f32,
) -> Vec<f32> {
    (0..=max_x)
        .map(|x| {
            let sums = sums_at::<K>(frame, plan, dots, x, y);
            plan.score(metric, sums, min_var_i).unwrap_or(f32::NEG_INFINITY)
        })
        .collect()
}

/// Returns the largest valid top-left placement.
pub(crate) fn placement_range(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
) -> SpriteWatchResult<(usize, usize)> {
    let img_width = image.width();
    let img_height = image.height();
    if img_width < plan.width() || img_height < plan.height() {
        return Err(SpriteWatchError::RoiOutOfBounds {
            x: 0,
            y: 0,
            width: plan.width(),
            height: plan.height(),
            img_width,
            img_height,
        });
    }
    Ok((img_width - plan.width(), img_height - plan.height()))
}

pub(crate) fn scan_row<K: Kernel + ?Sized>(
    frame: &PreparedFrame<'_>,
    plan: &TemplatePlan,
    dots: DotSource<'_>,
    y: usize,
    max_x: usize,
    params: ScanParams,
    mut emit: impl FnMut(Peak),
) {
    for x in 0..=max_x {
        let sums = sums_at::<K>(frame, plan, dots, x, y);
        if let Some(score) = plan.score(params.metric, sums, params.min_var_i) {
            if score >= params.min_score {
                emit(Peak { x, y, score });
            }
        }
    }
}
