//! Scalar reference kernel.

use crate::kernel::{Kernel, WindowSums};
use crate::template::TemplatePlan;
use crate::ImageView;

/// Scalar window accumulation, one pixel at a time.
pub struct ScalarKernel;

impl Kernel for ScalarKernel {
    fn window_sums(
        image: ImageView<'_, u8>,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> WindowSums {
        let tpl_width = plan.width();
        let values = plan.values();
        let data = image.as_slice();
        let stride = image.stride();

        let mut sums = WindowSums::default();
        for ty in 0..plan.height() {
            let start = (y + ty) * stride + x;
            let img_row = &data[start..start + tpl_width];
            let tpl_row = &values[ty * tpl_width..(ty + 1) * tpl_width];
            for (&pixel, &t) in img_row.iter().zip(tpl_row) {
                let v = pixel as u64;
                sums.sum_i += v;
                sums.sum_i2 += v * v;
                sums.dot += t as u64 * v;
            }
        }
        sums
    }
}
