//! Overlap suppression for candidates of a single class.

use crate::candidate::{candidate_cmp_desc, MatchCandidate};

/// Greedy suppression by box overlap.
///
/// Candidates are visited by descending score; one is kept when its overlap
/// fraction with every previously kept candidate is at most
/// `overlap_threshold`. With a threshold of `0.0` any shared pixel makes two
/// candidates the same object. The result is sorted by descending score and
/// does not depend on the input order.
pub fn suppress_overlaps(
    candidates: &mut [MatchCandidate],
    overlap_threshold: f32,
) -> Vec<MatchCandidate> {
    candidates.sort_by(candidate_cmp_desc);
    let mut kept: Vec<MatchCandidate> = Vec::new();

    'outer: for cand in candidates.iter() {
        let bbox = cand.bbox();
        for kept_cand in kept.iter() {
            if bbox.overlap_fraction(&kept_cand.bbox()) > overlap_threshold {
                continue 'outer;
            }
        }
        kept.push(cand.clone());
    }

    kept
}
