//! SIMD-accelerated window accumulation using the `wide` crate.
//!
//! The inner template row loop processes 8 pixels at a time in `i32x8`
//! lanes. Each row is reduced into the `u64` totals before the next one, so
//! lane sums cannot overflow for any realistic sprite width.

use crate::kernel::{Kernel, WindowSums};
use crate::template::TemplatePlan;
use crate::ImageView;
use wide::i32x8;

const LANES: usize = 8;

/// Load 8 u8 values and widen to i32x8.
#[inline]
fn load_u8x8(slice: &[u8]) -> i32x8 {
    i32x8::from([
        slice[0] as i32,
        slice[1] as i32,
        slice[2] as i32,
        slice[3] as i32,
        slice[4] as i32,
        slice[5] as i32,
        slice[6] as i32,
        slice[7] as i32,
    ])
}

/// Load 8 i32 values into i32x8.
#[inline]
fn load_i32x8(slice: &[i32]) -> i32x8 {
    i32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Horizontal sum of i32x8, widened to u64.
#[inline]
fn hsum(v: i32x8) -> u64 {
    v.to_array().iter().map(|&lane| lane as u64).sum()
}

/// SIMD window accumulation.
pub struct SimdKernel;

impl Kernel for SimdKernel {
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
        let simd_end = tpl_width / LANES * LANES;

        let mut sums = WindowSums::default();
        for ty in 0..plan.height() {
            let start = (y + ty) * stride + x;
            let img_row = &data[start..start + tpl_width];
            let tpl_row = &values[ty * tpl_width..(ty + 1) * tpl_width];

            let mut sum_vec = i32x8::splat(0);
            let mut sq_vec = i32x8::splat(0);
            let mut dot_vec = i32x8::splat(0);
            let mut tx = 0;
            while tx < simd_end {
                let img_vals = load_u8x8(&img_row[tx..]);
                let tpl_vals = load_i32x8(&tpl_row[tx..]);
                sum_vec = sum_vec + img_vals;
                sq_vec = sq_vec + img_vals * img_vals;
                dot_vec = dot_vec + tpl_vals * img_vals;
                tx += LANES;
            }
            sums.sum_i += hsum(sum_vec);
            sums.sum_i2 += hsum(sq_vec);
            sums.dot += hsum(dot_vec);

            // Scalar remainder
            while tx < tpl_width {
                let v = img_row[tx] as u64;
                sums.sum_i += v;
                sums.sum_i2 += v * v;
                sums.dot += tpl_row[tx] as u64 * v;
                tx += 1;
            }
        }
        sums
    }
}
