//! Summed-area tables for constant-time window statistics.

use crate::ImageView;

/// Inclusive prefix sums of `I` and `I²` over a frame.
///
/// Tables are `(width + 1) × (height + 1)` with a zero first row and column,
/// so any window sum is four lookups.
#[derive(Clone, Debug)]
pub struct IntegralSums {
    width: usize,
    height: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl IntegralSums {
    pub fn new(image: ImageView<'_, u8>) -> Self {
        let width = image.width();
        let height = image.height();
        let cols = width + 1;
        let mut sum = vec![0u64; cols * (height + 1)];
        let mut sum_sq = vec![0u64; cols * (height + 1)];

        for y in 0..height {
            let Some(row) = image.row(y) else { break };
            let mut run = 0u64;
            let mut run_sq = 0u64;
            let above = y * cols;
            let here = (y + 1) * cols;
            for (x, &pixel) in row.iter().enumerate() {
                let v = pixel as u64;
                run += v;
                run_sq += v * v;
                sum[here + x + 1] = sum[above + x + 1] + run;
                sum_sq[here + x + 1] = sum_sq[above + x + 1] + run_sq;
            }
        }

        Self {
            width,
            height,
            sum,
            sum_sq,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(ΣI, ΣI²)` over the `width × height` window at `(x, y)`.
    ///
    /// The caller guarantees the window lies inside the frame.
    #[inline]
    pub fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (u64, u64) {
        let cols = self.width + 1;
        let top = y * cols;
        let bottom = (y + height) * cols;
        let (l, r) = (x, x + width);
        let rect = |t: &[u64]| t[bottom + r] + t[top + l] - t[top + r] - t[bottom + l];
        (rect(&self.sum), rect(&self.sum_sq))
    }
}
