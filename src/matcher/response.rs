//! Dense correlation response surfaces.

use crate::util::{SpriteWatchError, SpriteWatchResult};

/// Scores for every top-left placement of a template inside a frame.
///
/// Cells whose window carries no signal hold `f32::NEG_INFINITY`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseMap {
    scores: Vec<f32>,
    width: usize,
    height: usize,
}

impl ResponseMap {
    pub(crate) fn new(scores: Vec<f32>, width: usize, height: usize) -> SpriteWatchResult<Self> {
        if scores.len() != width * height {
            return Err(SpriteWatchError::BufferTooSmall {
                needed: width * height,
                got: scores.len(),
            });
        }
        Ok(Self {
            scores,
            width,
            height,
        })
    }

    /// Number of placement columns (`frame_width - template_width + 1`).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of placement rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the score at placement `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.scores.get(y * self.width + x).copied()
    }

    /// Row-major scores.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// The best placement as `(x, y, score)`, ties to smallest (top, left).
    pub fn max(&self) -> Option<(usize, usize, f32)> {
        let mut best: Option<(usize, usize, f32)> = None;
        for (idx, &score) in self.scores.iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((idx % self.width, idx / self.width, score));
            }
        }
        best
    }
}
