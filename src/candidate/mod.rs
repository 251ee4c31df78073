//! Match candidates, bounding boxes, and candidate pruning.
//!
//! Includes Top-K peak collection and per-class overlap suppression.

pub(crate) mod nms;
pub(crate) mod topk;

use crate::template::ObjectClass;
use std::cmp::Ordering;
use std::sync::Arc;

/// Axis-aligned box in frame coordinates; `x` is the left column and `y` the
/// top row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl BoundingBox {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the last column.
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// One past the last row.
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Number of pixels covered by both boxes.
    pub fn intersection_area(&self, other: &BoundingBox) -> usize {
        let w = self.right().min(other.right()).saturating_sub(self.x.max(other.x));
        let h = self
            .bottom()
            .min(other.bottom())
            .saturating_sub(self.y.max(other.y));
        w * h
    }

    /// Intersection area as a fraction of the smaller box, in `[0, 1]`.
    pub fn overlap_fraction(&self, other: &BoundingBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller == 0 {
            return 0.0;
        }
        self.intersection_area(other) as f32 / smaller as f32
    }
}

/// An unconfirmed match of one template against one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchCandidate {
    pub class: ObjectClass,
    /// Position of the template within its class.
    pub template_index: usize,
    pub template_name: Arc<str>,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub score: f32,
}

impl MatchCandidate {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

/// Descending score, then smallest (top, left), then lowest template index.
pub(crate) fn candidate_cmp_desc(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
        .then_with(|| a.template_index.cmp(&b.template_index))
        .then_with(|| a.width.cmp(&b.width))
        .then_with(|| a.height.cmp(&b.height))
}

#[cfg(test)]
mod tests {
    use super::BoundingBox;

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(10, 0, 10, 10);
        assert_eq!(a.intersection_area(&b), 0);
        assert_eq!(a.overlap_fraction(&b), 0.0);
    }

    #[test]
    fn overlap_is_relative_to_smaller_box() {
        let big = BoundingBox::new(0, 0, 20, 20);
        let small = BoundingBox::new(5, 5, 4, 4);
        assert_eq!(big.overlap_fraction(&small), 1.0);

        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(5, 0, 10, 10);
        assert!((a.overlap_fraction(&b) - 0.5).abs() < 1e-6);
    }
}
