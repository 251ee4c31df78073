//! Per-frame detection: every template of every class, merged per class.

use crate::candidate::nms::suppress_overlaps;
use crate::candidate::{BoundingBox, MatchCandidate};
use crate::library::{ClassSpec, TemplateLibrary};
use crate::matcher::{MatchConfig, MatchMode, Matcher};
use crate::template::{ObjectClass, Template};
use crate::trace::{trace_event, trace_span};
use crate::util::{SpriteWatchError, SpriteWatchResult};
use crate::kernel::{DotSurface, PreparedFrame};
use crate::ImageView;
use std::sync::Arc;

/// A confirmed object in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class: ObjectClass,
    pub bbox: BoundingBox,
    pub confidence: f32,
    /// Name of the template that produced the surviving candidate.
    pub template: Arc<str>,
}

impl From<MatchCandidate> for Detection {
    fn from(cand: MatchCandidate) -> Self {
        Self {
            bbox: cand.bbox(),
            class: cand.class,
            confidence: cand.score,
            template: cand.template_name,
        }
    }
}

/// Configuration for the aggregator.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Two candidates of one class are the same object when their overlap
    /// fraction (relative to the smaller box) exceeds this value. In `[0, 1)`.
    pub overlap_threshold: f32,
    /// Run (class, template) jobs on the rayon pool (requires the `rayon`
    /// feature).
    pub parallel: bool,
    pub matcher: MatchConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.0,
            parallel: false,
            matcher: MatchConfig::default(),
        }
    }
}

/// Runs the matcher for every template in a library and merges the results.
#[derive(Clone, Debug, Default)]
pub struct DetectionAggregator {
    cfg: AggregatorConfig,
    matcher: Matcher,
}

impl DetectionAggregator {
    /// Creates an aggregator, rejecting overlap thresholds outside `[0, 1)`.
    pub fn new(cfg: AggregatorConfig) -> SpriteWatchResult<Self> {
        if !(cfg.overlap_threshold >= 0.0 && cfg.overlap_threshold < 1.0) {
            return Err(SpriteWatchError::InvalidInput(
                "overlap threshold must be in [0, 1)",
            ));
        }
        let matcher = Matcher::new().with_config(cfg.matcher.clone());
        Ok(Self { cfg, matcher })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.cfg
    }

    /// Detects every class of `library` in a grayscale frame.
    ///
    /// Output is ordered by class declaration order, then by (top, left).
    pub fn aggregate(
        &self,
        image: ImageView<'_, u8>,
        library: &TemplateLibrary,
    ) -> SpriteWatchResult<Vec<Detection>> {
        let _span = trace_span!(
            "aggregate",
            width = image.width(),
            height = image.height()
        )
        .entered();
        library.check_fits(image.width(), image.height())?;

        let frame = PreparedFrame::new(image);
        let jobs: Vec<(&ClassSpec, &Template)> = library.iter().collect();
        let templates: Vec<&Template> = jobs.iter().map(|&(_, template)| template).collect();
        let surfaces = self.matcher.dot_surfaces(&frame, &templates);
        let per_job = self.run_jobs(&frame, &jobs, &surfaces);

        let mut candidates = Vec::new();
        for result in per_job {
            candidates.extend(result?);
        }
        trace_event!("aggregate_candidates", count = candidates.len());

        let detections = self.merge(library, candidates);
        trace_event!("aggregate_detections", count = detections.len());
        Ok(detections)
    }

    /// Collapses candidates into one detection per object per class.
    ///
    /// The result does not depend on the order of `candidates`. Candidates of
    /// classes not declared in `library` are dropped.
    pub fn merge(
        &self,
        library: &TemplateLibrary,
        candidates: Vec<MatchCandidate>,
    ) -> Vec<Detection> {
        let mut by_class: Vec<Vec<MatchCandidate>> = vec![Vec::new(); library.class_count()];
        for cand in candidates {
            if let Some(idx) = library.class_index(&cand.class) {
                by_class[idx].push(cand);
            }
        }

        let mut detections = Vec::new();
        for (spec, mut group) in library.classes().zip(by_class) {
            if group.is_empty() {
                continue;
            }
            let mut kept = suppress_overlaps(&mut group, self.cfg.overlap_threshold);
            if spec.mode == MatchMode::Best {
                kept.truncate(1);
            }
            kept.sort_by(|a, b| {
                a.y.cmp(&b.y)
                    .then_with(|| a.x.cmp(&b.x))
                    .then_with(|| a.template_index.cmp(&b.template_index))
            });
            detections.extend(kept.into_iter().map(Detection::from));
        }
        detections
    }

    fn run_jobs(
        &self,
        frame: &PreparedFrame<'_>,
        jobs: &[(&ClassSpec, &Template)],
        surfaces: &[Option<DotSurface>],
    ) -> Vec<SpriteWatchResult<Vec<MatchCandidate>>> {
        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                use rayon::prelude::*;
                return jobs
                    .par_iter()
                    .zip(surfaces)
                    .map(|(job, surface)| self.run_job(frame, job, surface.as_ref()))
                    .collect();
            }
        }
        jobs.iter()
            .zip(surfaces)
            .map(|(job, surface)| self.run_job(frame, job, surface.as_ref()))
            .collect()
    }

    fn run_job(
        &self,
        frame: &PreparedFrame<'_>,
        &(spec, template): &(&ClassSpec, &Template),
        surface: Option<&DotSurface>,
    ) -> SpriteWatchResult<Vec<MatchCandidate>> {
        let threshold = template.threshold().unwrap_or(spec.threshold);
        self.matcher
            .find_with(frame, template, threshold, spec.mode, surface)
    }
}

#[cfg(test)]
mod tests {
    use super::{AggregatorConfig, DetectionAggregator};
    use crate::candidate::MatchCandidate;
    use crate::image::GrayImage;
    use crate::library::{ClassSpec, TemplateLibrary, TemplateSource};
    use crate::matcher::MatchMode;
    use crate::template::ObjectClass;

    fn library() -> TemplateLibrary {
        let img = GrayImage::filled(10, 10, 255).unwrap();
        TemplateLibrary::builder()
            .class(
                ClassSpec::new("runner").with_mode(MatchMode::Best),
                vec![TemplateSource::new("run", img.clone())],
            )
            .class(
                ClassSpec::new("cactus"),
                vec![
                    TemplateSource::new("small", img.clone()),
                    TemplateSource::new("large", img),
                ],
            )
            .build()
            .unwrap()
    }

    fn cand(class: &str, template_index: usize, x: usize, y: usize, score: f32) -> MatchCandidate {
        MatchCandidate {
            class: ObjectClass::new(class),
            template_index,
            template_name: format!("{class}{template_index}").into(),
            x,
            y,
            width: 10,
            height: 10,
            score,
        }
    }

    #[test]
    fn best_class_keeps_single_detection() {
        let agg = DetectionAggregator::default();
        let dets = agg.merge(
            &library(),
            vec![cand("runner", 0, 0, 0, 0.9), cand("runner", 0, 50, 0, 0.95)],
        );
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox.x, 50);
    }

    #[test]
    fn output_follows_class_then_position() {
        let agg = DetectionAggregator::default();
        let dets = agg.merge(
            &library(),
            vec![
                cand("cactus", 1, 80, 5, 0.99),
                cand("cactus", 0, 20, 5, 0.85),
                cand("runner", 0, 40, 40, 0.9),
                cand("ghost", 0, 0, 0, 1.0),
            ],
        );
        let order: Vec<(&str, usize)> = dets
            .iter()
            .map(|d| (d.class.as_str(), d.bbox.x))
            .collect();
        assert_eq!(order, vec![("runner", 40), ("cactus", 20), ("cactus", 80)]);
        assert_eq!(&*dets[2].template, "cactus1");
    }

    #[test]
    fn rejects_overlap_threshold_of_one() {
        let cfg = AggregatorConfig {
            overlap_threshold: 1.0,
            ..AggregatorConfig::default()
        };
        assert!(DetectionAggregator::new(cfg).is_err());
    }
}
