//! Template plan precomputation for correlation scoring.

use crate::image::ImageView;
use crate::kernel::spectral::SpectrumCache;
use crate::kernel::WindowSums;
use crate::matcher::Metric;

/// Precomputed template statistics shared by every kernel.
///
/// All sums are exact integers, so the only rounding in a score happens in
/// the final division.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    values: Vec<i32>,
    sum_t: u64,
    sum_t2: u64,
    spectrum: SpectrumCache,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> Self {
        let width = tpl.width();
        let height = tpl.height();
        let mut values = Vec::with_capacity(width * height);
        let mut sum_t = 0u64;
        let mut sum_t2 = 0u64;
        for y in 0..height {
            if let Some(row) = tpl.row(y) {
                for &value in row {
                    let v = value as u64;
                    sum_t += v;
                    sum_t2 += v * v;
                    values.push(value as i32);
                }
            }
        }
        Self {
            width,
            height,
            values,
            sum_t,
            sum_t2,
            spectrum: SpectrumCache::default(),
        }
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of template pixels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Template intensities in row-major order.
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn sum_t(&self) -> u64 {
        self.sum_t
    }

    pub fn sum_t2(&self) -> u64 {
        self.sum_t2
    }

    /// Frequency-domain copy of the template for the current frame size.
    pub(crate) fn spectrum_cache(&self) -> &SpectrumCache {
        &self.spectrum
    }

    /// `n * var(T) * n`, the zero-mean energy scaled by the pixel count.
    fn n_var_t(&self) -> u128 {
        let n = self.values.len() as u128;
        n * self.sum_t2 as u128 - (self.sum_t as u128) * (self.sum_t as u128)
    }

    /// Returns why this template cannot be scored with `metric`, if it can't.
    pub fn degenerate_reason(&self, metric: Metric) -> Option<&'static str> {
        match metric {
            Metric::Ncc if self.sum_t2 == 0 => Some("all pixels are zero"),
            Metric::Zncc if self.n_var_t() == 0 => Some("zero variance"),
            _ => None,
        }
    }

    /// Turns window sums into a correlation score.
    ///
    /// Returns `None` when the window carries no signal for `metric` (zero
    /// energy for `Ncc`, per-pixel variance at or below `min_var_i` for
    /// `Zncc`) or when the template itself is degenerate.
    pub fn score(&self, metric: Metric, sums: WindowSums, min_var_i: f32) -> Option<f32> {
        let n = self.values.len() as f64;
        let score = match metric {
            Metric::Ncc => {
                let mean_sq = sums.sum_i2 as f64 / n;
                if sums.sum_i2 == 0 || mean_sq <= min_var_i as f64 || self.sum_t2 == 0 {
                    return None;
                }
                let denom = (self.sum_t2 as f64 * sums.sum_i2 as f64).sqrt();
                sums.dot as f64 / denom
            }
            Metric::Zncc => {
                let n_int = self.values.len() as i128;
                let n_var_i =
                    n_int * sums.sum_i2 as i128 - (sums.sum_i as i128) * (sums.sum_i as i128);
                let n_var_t = self.n_var_t();
                if n_var_i <= 0 || n_var_t == 0 || (n_var_i as f64) / (n * n) <= min_var_i as f64
                {
                    return None;
                }
                let num = n_int * sums.dot as i128 - (self.sum_t as i128) * (sums.sum_i as i128);
                let denom = (n_var_t as f64 * n_var_i as f64).sqrt();
                num as f64 / denom
            }
        };
        if score.is_finite() {
            Some(score.clamp(-1.0, 1.0) as f32)
        } else {
            None
        }
    }
}
