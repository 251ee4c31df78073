//! Single-template matching against a grayscale frame.
//!
//! The matcher scores every placement of a template inside the frame (the
//! response surface) and keeps the cells at or above a confidence threshold.
//! "Not present" is an empty result, never an error.
//!
//! Sprite-sized templates take ΣTI from one frequency-domain pass over the
//! frame; tiny ones are accumulated window by window. Both give the same
//! exact sums.

mod response;

pub use response::ResponseMap;

use crate::candidate::topk::Peak;
use crate::candidate::MatchCandidate;
use crate::kernel::{
    placement_range, response_row, scan_full, DotSource, DotSurface, PreparedFrame, ScanParams,
};
use crate::template::{Template, TemplatePlan};
use crate::trace::{trace_event, trace_span};
use crate::util::{SpriteWatchError, SpriteWatchResult};
use crate::ImageView;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::ScalarKernel as ActiveKernel;
#[cfg(feature = "simd")]
use crate::kernel::simd::SimdKernel as ActiveKernel;

/// Correlation measure used to score a placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Metric {
    /// `ΣTI / sqrt(ΣT²·ΣI²)`; handles flat single-intensity sprites.
    #[default]
    Ncc,
    /// Zero-mean normalized cross-correlation in `[-1, 1]`; invariant to
    /// brightness offsets, requires a template with some contrast.
    Zncc,
}

/// How many candidates one template may produce per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// At most one candidate: the highest score, ties to smallest (top, left).
    Best,
    /// Every cell at or above the threshold.
    #[default]
    All,
}

/// Configuration for the matcher.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Score response rows on the rayon pool (requires the `rayon` feature).
    pub parallel: bool,
    /// Windows whose per-pixel variance (`Zncc`) or mean square (`Ncc`) is at
    /// or below this value are never candidates.
    pub min_var_i: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            min_var_i: 0.0,
        }
    }
}

/// Matcher for one template against one grayscale frame.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    /// Creates a matcher with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the matcher configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Finds placements of `template` scoring at least `threshold`.
    ///
    /// `All` results are sorted by descending score with ties broken by
    /// smallest (top, left); `Best` returns at most the first of those.
    pub fn find(
        &self,
        image: ImageView<'_, u8>,
        template: &Template,
        threshold: f32,
        mode: MatchMode,
    ) -> SpriteWatchResult<Vec<MatchCandidate>> {
        validate_threshold(threshold)?;
        check_fits(image, template)?;
        self.find_prepared(&PreparedFrame::new(image), template, threshold, mode)
    }

    /// [`Matcher::find`] on a frame whose tables are shared across templates.
    pub fn find_prepared(
        &self,
        frame: &PreparedFrame<'_>,
        template: &Template,
        threshold: f32,
        mode: MatchMode,
    ) -> SpriteWatchResult<Vec<MatchCandidate>> {
        validate_threshold(threshold)?;
        check_fits(frame.view(), template)?;
        let surface = frame
            .prefers_spectral(template.plan())
            .then(|| frame.correlator().dots(template.plan()));
        self.find_with(frame, template, threshold, mode, surface.as_ref())
    }

    /// Computes ΣTI surfaces for every template that benefits from one.
    ///
    /// Spectral templates are correlated two per inverse transform. The
    /// result is index-aligned with `templates`; direct templates get `None`.
    pub(crate) fn dot_surfaces(
        &self,
        frame: &PreparedFrame<'_>,
        templates: &[&Template],
    ) -> Vec<Option<DotSurface>> {
        let spectral: Vec<usize> = templates
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.width() <= frame.width()
                    && t.height() <= frame.height()
                    && frame.prefers_spectral(t.plan())
            })
            .map(|(idx, _)| idx)
            .collect();
        if spectral.is_empty() {
            return vec![None; templates.len()];
        }

        let correlator = frame.correlator();
        let run = |chunk: &[usize]| -> Vec<(usize, DotSurface)> {
            match *chunk {
                [a, b] => {
                    let (sa, sb) =
                        correlator.dots_pair(templates[a].plan(), templates[b].plan());
                    vec![(a, sa), (b, sb)]
                }
                [a] => vec![(a, correlator.dots(templates[a].plan()))],
                _ => Vec::new(),
            }
        };

        #[cfg(feature = "rayon")]
        let computed: Vec<Vec<(usize, DotSurface)>> = if self.cfg.parallel {
            use rayon::prelude::*;
            spectral.par_chunks(2).map(run).collect()
        } else {
            spectral.chunks(2).map(run).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let computed: Vec<Vec<(usize, DotSurface)>> = spectral.chunks(2).map(run).collect();

        let mut surfaces = vec![None; templates.len()];
        for (idx, surface) in computed.into_iter().flatten() {
            surfaces[idx] = Some(surface);
        }
        surfaces
    }

    /// Scans `template` with ΣTI from `surface` when given, directly otherwise.
    pub(crate) fn find_with(
        &self,
        frame: &PreparedFrame<'_>,
        template: &Template,
        threshold: f32,
        mode: MatchMode,
        surface: Option<&DotSurface>,
    ) -> SpriteWatchResult<Vec<MatchCandidate>> {
        validate_threshold(threshold)?;
        check_fits(frame.view(), template)?;
        let _span = trace_span!(
            "match_template",
            class = template.class().as_str(),
            template = template.name(),
            spectral = surface.is_some()
        )
        .entered();

        let params = ScanParams {
            metric: template.metric(),
            limit: match mode {
                MatchMode::Best => Some(1),
                MatchMode::All => None,
            },
            min_var_i: self.cfg.min_var_i,
            min_score: threshold,
        };
        let dots = surface.map_or(DotSource::Direct, DotSource::Surface);
        let peaks = self.scan(frame, template.plan(), dots, params)?;
        trace_event!("match_candidates", count = peaks.len());

        Ok(peaks
            .into_iter()
            .map(|peak| MatchCandidate {
                class: template.class().clone(),
                template_index: template.index(),
                template_name: template.shared_name(),
                x: peak.x,
                y: peak.y,
                width: template.width(),
                height: template.height(),
                score: peak.score,
            })
            .collect())
    }

    /// Computes the full response surface of `template` over `image`.
    pub fn response(
        &self,
        image: ImageView<'_, u8>,
        template: &Template,
    ) -> SpriteWatchResult<ResponseMap> {
        check_fits(image, template)?;
        let frame = PreparedFrame::new(image);
        let plan = template.plan();
        let surface = frame
            .prefers_spectral(plan)
            .then(|| frame.correlator().dots(plan));
        let dots = surface.as_ref().map_or(DotSource::Direct, DotSource::Surface);
        let (max_x, max_y) = placement_range(image, plan)?;
        let metric = template.metric();

        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                let params = ScanParams {
                    metric,
                    limit: None,
                    min_var_i: self.cfg.min_var_i,
                    min_score: f32::NEG_INFINITY,
                };
                let scores = crate::kernel::rayon::response_rows_par::<ActiveKernel>(
                    &frame, plan, dots, params,
                )?;
                return ResponseMap::new(scores, max_x + 1, max_y + 1);
            }
        }

        let mut scores = Vec::with_capacity((max_x + 1) * (max_y + 1));
        for y in 0..=max_y {
            scores.extend(response_row::<ActiveKernel>(
                &frame,
                plan,
                dots,
                y,
                max_x,
                metric,
                self.cfg.min_var_i,
            ));
        }
        ResponseMap::new(scores, max_x + 1, max_y + 1)
    }

    fn scan(
        &self,
        frame: &PreparedFrame<'_>,
        plan: &TemplatePlan,
        dots: DotSource<'_>,
        params: ScanParams,
    ) -> SpriteWatchResult<Vec<Peak>> {
        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                return crate::kernel::rayon::scan_full_par::<ActiveKernel>(
                    frame, plan, dots, params,
                );
            }
        }
        scan_full::<ActiveKernel>(frame, plan, dots, params)
    }
}

/// Thresholds are confidences in `(0, 1]`.
pub(crate) fn validate_threshold(threshold: f32) -> SpriteWatchResult<()> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(SpriteWatchError::InvalidInput("threshold must be in (0, 1]"))
    }
}

fn check_fits(image: ImageView<'_, u8>, template: &Template) -> SpriteWatchResult<()> {
    if template.width() > image.width() || template.height() > image.height() {
        return Err(SpriteWatchError::TemplateSize {
            template: template.name().to_string(),
            template_width: template.width(),
            template_height: template.height(),
            frame_width: image.width(),
            frame_height: image.height(),
        });
    }
    Ok(())
}
