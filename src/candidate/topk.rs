//! Peak collection for response-surface scans.

use std::cmp::Ordering;

/// A response-surface cell that passed the score threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Left edge of the placement.
    pub x: usize,
    /// Top edge of the placement.
    pub y: usize,
    pub score: f32,
}

/// Descending score, then smallest (top, left).
pub(crate) fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

pub(crate) fn sort_peaks_desc(peaks: &mut [Peak]) {
    peaks.sort_by(peak_cmp_desc);
}

/// Keeps the `k` best peaks seen so far under [`peak_cmp_desc`].
///
/// Eviction is a linear scan of the kept set.
pub struct TopK<T> {
    k: usize,
    items: Vec<T>,
}

impl TopK<Peak> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, peak: Peak) {
        if self.items.len() < self.k {
            self.items.push(peak);
            return;
        }
        let worst = self
            .items
            .iter_mut()
            .max_by(|a, b| peak_cmp_desc(a, b));
        if let Some(worst) = worst {
            if peak_cmp_desc(&peak, worst) == Ordering::Less {
                *worst = peak;
            }
        }
    }

    pub fn into_sorted_desc(mut self) -> Vec<Peak> {
        sort_peaks_desc(&mut self.items);
        self.items
    }
}

/// Collects either every peak or only the best `k`.
pub(crate) enum PeakCollector {
    All(Vec<Peak>),
    Top(TopK<Peak>),
}

impl PeakCollector {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        match limit {
            Some(k) => PeakCollector::Top(TopK::new(k)),
            None => PeakCollector::All(Vec::new()),
        }
    }

    pub(crate) fn push(&mut self, peak: Peak) {
        match self {
            PeakCollector::All(items) => items.push(peak),
            PeakCollector::Top(topk) => topk.push(peak),
        }
    }

    pub(crate) fn into_sorted_desc(self) -> Vec<Peak> {
        match self {
            PeakCollector::All(mut items) => {
                sort_peaks_desc(&mut items);
                items
            }
            PeakCollector::Top(topk) => topk.into_sorted_desc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Peak, PeakCollector, TopK};

    fn peak(x: usize, y: usize, score: f32) -> Peak {
        Peak { x, y, score }
    }

    #[test]
    fn topk_keeps_highest_scores() {
        let mut topk = TopK::new(2);
        topk.push(peak(0, 0, 0.5));
        topk.push(peak(1, 0, 0.9));
        topk.push(peak(2, 0, 0.7));
        assert_eq!(topk.len(), 2);
        let out = topk.into_sorted_desc();
        assert_eq!(out, vec![peak(1, 0, 0.9), peak(2, 0, 0.7)]);
    }

    #[test]
    fn ties_prefer_smallest_top_then_left() {
        let mut topk = TopK::new(1);
        topk.push(peak(5, 3, 0.9));
        topk.push(peak(9, 1, 0.9));
        topk.push(peak(2, 1, 0.9));
        assert_eq!(topk.into_sorted_desc(), vec![peak(2, 1, 0.9)]);
    }

    #[test]
    fn unbounded_collector_sorts_everything() {
        let mut all = PeakCollector::new(None);
        for (i, score) in [0.2f32, 0.8, 0.5].into_iter().enumerate() {
            all.push(peak(i, 0, score));
        }
        let scores: Vec<f32> = all.into_sorted_desc().iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.8, 0.5, 0.2]);
    }
}
