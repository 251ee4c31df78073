//! Rayon-parallel scans (feature-gated).
//!
//! Rows of the response surface are scored on the rayon pool and merged in
//! row order, so the output is identical to the sequential scan.

use crate::candidate::topk::{Peak, PeakCollector};
use crate::kernel::{
    placement_range, response_row, scan_row, DotSource, Kernel, PreparedFrame, ScanParams,
};
use crate::template::TemplatePlan;
use crate::util::SpriteWatchResult;
use rayon::prelude::*;

/// Row-parallel counterpart of [`crate::kernel::scan_full`].
pub fn scan_full_par<K: Kernel + ?Sized>(
    frame: &PreparedFrame<'_>,
    plan: &TemplatePlan,
    dots: DotSource<'_>,
    params: ScanParams,
) -> SpriteWatchResult<Vec<Peak>> {
    let (max_x, max_y) = placement_range(frame.view(), plan)?;

    let row_results: Vec<Vec<Peak>> = (0..=max_y)
        .into_par_iter()
        .map(|y| {
            let mut row_peaks = Vec::new();
            scan_row::<K>(frame, plan, dots, y, max_x, params, |peak| {
                row_peaks.push(peak)
            });
            row_peaks
        })
        .collect();

    let mut peaks = PeakCollector::new(params.limit);
    for peak in row_results.into_iter().flatten() {
        peaks.push(peak);
    }
    Ok(peaks.into_sorted_desc())
}

/// Row-parallel response surface; undefined cells hold `NEG_INFINITY`.
pub fn response_rows_par<K: Kernel + ?Sized>(
    frame: &PreparedFrame<'_>,
    plan: &TemplatePlan,
    dots: DotSource<'_>,
    params: ScanParams,
) -> SpriteWatchResult<Vec<f32>> {
    let (max_x, max_y) = placement_range(frame.view(), plan)?;
    let rows: Vec<Vec<f32>> = (0..=max_y)
        .into_par_iter()
        .map(|y| response_row::<K>(frame, plan, dots, y, max_x, params.metric, params.min_var_i))
        .collect();
    Ok(rows.into_iter().flatten().collect())
}
