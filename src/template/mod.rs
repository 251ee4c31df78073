//! Reference sprites and their object classes.

use crate::image::{GrayImage, ImageView};
use crate::matcher::Metric;
use crate::util::{SpriteWatchError, SpriteWatchResult};
use std::fmt;
use std::sync::Arc;

mod plan;

pub use plan::TemplatePlan;

/// Identifier of a detectable object kind such as `runner`, `bird` or
/// `cactus`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectClass(Arc<str>);

impl ObjectClass {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectClass {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Immutable grayscale reference bitmap for one appearance of an object.
#[derive(Clone, Debug)]
pub struct Template {
    name: Arc<str>,
    class: ObjectClass,
    index: usize,
    metric: Metric,
    threshold: Option<f32>,
    img: GrayImage,
    plan: TemplatePlan,
}

impl Template {
    /// Creates a template scored with `metric`.
    ///
    /// Fails with `DegenerateTemplate` when the bitmap cannot produce a
    /// defined score under that metric.
    pub fn new(
        name: &str,
        class: ObjectClass,
        img: GrayImage,
        metric: Metric,
    ) -> SpriteWatchResult<Self> {
        let plan = TemplatePlan::from_view(img.view());
        if let Some(reason) = plan.degenerate_reason(metric) {
            return Err(SpriteWatchError::DegenerateTemplate {
                template: name.to_string(),
                reason,
            });
        }
        Ok(Self {
            name: Arc::from(name),
            class,
            index: 0,
            metric,
            threshold: None,
            img,
            plan,
        })
    }

    /// Overrides the class threshold for this template only.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn class(&self) -> &ObjectClass {
        &self.class
    }

    /// Position of this template within its class.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// The per-template threshold override, if any.
    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    pub fn width(&self) -> usize {
        self.img.width()
    }

    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Returns a borrowed view of the template pixels.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }
}
