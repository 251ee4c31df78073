//! The fixed set of reference templates, grouped by object class.
//!
//! A library is assembled once at startup, either from in-memory bitmaps via
//! [`TemplateLibrary::builder`] or from image files via
//! [`TemplateLibrary::load`] (`image-io` feature), and is immutable
//! afterwards. Class declaration order is the order detections are reported
//! in.

use crate::image::GrayImage;
use crate::matcher::{validate_threshold, MatchMode, Metric};
use crate::template::{ObjectClass, Template};
use crate::util::{SpriteWatchError, SpriteWatchResult};
#[cfg(feature = "image-io")]
use std::path::PathBuf;

/// How the sink should outline detections of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStyle {
    /// RGB outline color.
    pub color: [u8; 3],
    /// Outline thickness in pixels.
    pub thickness: u32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            thickness: 2,
        }
    }
}

/// Per-class detection settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassSpec {
    pub class: ObjectClass,
    /// Minimum correlation for a candidate, in `(0, 1]`.
    pub threshold: f32,
    pub mode: MatchMode,
    pub metric: Metric,
    pub style: RenderStyle,
}

impl ClassSpec {
    /// Settings for `name` with threshold 0.8, all-matches mode and `Ncc`.
    ///
    /// `Ncc` ignores brightness offsets, so a mostly-white sprite scores above
    /// 0.9 against any plain white patch. Sprites drawn on a flat background
    /// should use [`Metric::Zncc`] through [`ClassSpec::with_metric`]; flat
    /// windows then never match.
    pub fn new(name: &str) -> Self {
        Self {
            class: ObjectClass::new(name),
            threshold: 0.8,
            mode: MatchMode::All,
            metric: Metric::Ncc,
            style: RenderStyle::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// `Zncc` rejects templates without variance, see [`ClassSpec::new`].
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }
}

/// A named bitmap waiting to be registered under a class.
#[derive(Clone, Debug)]
pub struct TemplateSource {
    pub name: String,
    pub image: GrayImage,
    /// Overrides the class threshold for this template.
    pub threshold: Option<f32>,
}

impl TemplateSource {
    pub fn new(name: &str, image: GrayImage) -> Self {
        Self {
            name: name.to_string(),
            image,
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// Template files for one class, used by [`TemplateLibrary::load`].
#[cfg(feature = "image-io")]
#[derive(Clone, Debug)]
pub struct ClassSource {
    pub spec: ClassSpec,
    pub paths: Vec<PathBuf>,
}

#[derive(Clone, Debug)]
struct ClassEntry {
    spec: ClassSpec,
    templates: Vec<Template>,
}

/// Immutable reference set, one entry per object class.
#[derive(Clone, Debug)]
pub struct TemplateLibrary {
    classes: Vec<ClassEntry>,
}

impl TemplateLibrary {
    /// Starts an in-memory library.
    pub fn builder() -> LibraryBuilder {
        LibraryBuilder::default()
    }

    /// Loads every class's template files.
    ///
    /// Any file that cannot be decoded, or whose pixels cannot be scored with
    /// the class metric, fails the whole load with `TemplateLoad` naming that
    /// file.
    #[cfg(feature = "image-io")]
    pub fn load(classes: Vec<ClassSource>) -> SpriteWatchResult<Self> {
        let mut builder = Self::builder();
        for source in classes {
            let mut templates = Vec::with_capacity(source.paths.len());
            for path in &source.paths {
                let image = crate::image::io::load_gray_image(path)?;
                let metric = source.spec.metric;
                let plan = crate::template::TemplatePlan::from_view(image.view());
                if let Some(reason) = plan.degenerate_reason(metric) {
                    return Err(SpriteWatchError::TemplateLoad {
                        path: path.clone(),
                        reason: format!("unusable for {metric:?}: {reason}"),
                    });
                }
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                templates.push(TemplateSource::new(&name, image));
            }
            builder = builder.class(source.spec, templates);
        }
        builder.build()
    }

    /// Class settings in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassSpec> {
        self.classes.iter().map(|entry| &entry.spec)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Total number of templates across all classes.
    pub fn template_count(&self) -> usize {
        self.classes.iter().map(|entry| entry.templates.len()).sum()
    }

    /// Declaration position of `class`.
    pub fn class_index(&self, class: &ObjectClass) -> Option<usize> {
        self.classes.iter().position(|entry| &entry.spec.class == class)
    }

    pub fn class_spec(&self, class: &ObjectClass) -> Option<&ClassSpec> {
        self.class_index(class).map(|idx| &self.classes[idx].spec)
    }

    /// Templates registered for `class`, in registration order.
    pub fn templates_for(&self, class: &ObjectClass) -> SpriteWatchResult<&[Template]> {
        self.class_index(class)
            .map(|idx| self.classes[idx].templates.as_slice())
            .ok_or_else(|| SpriteWatchError::UnknownClass(class.to_string()))
    }

    /// Every (class settings, template) pair in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ClassSpec, &Template)> {
        self.classes
            .iter()
            .flat_map(|entry| entry.templates.iter().map(move |tpl| (&entry.spec, tpl)))
    }

    /// Largest template width and height (not necessarily the same template).
    pub fn max_template_size(&self) -> (usize, usize) {
        self.iter().fold((0, 0), |(w, h), (_, tpl)| {
            (w.max(tpl.width()), h.max(tpl.height()))
        })
    }

    /// Fails with `TemplateSize` naming the first template that does not fit
    /// in a `width x height` frame.
    pub fn check_fits(&self, width: usize, height: usize) -> SpriteWatchResult<()> {
        match self
            .iter()
            .find(|(_, tpl)| tpl.width() > width || tpl.height() > height)
        {
            Some((_, tpl)) => Err(SpriteWatchError::TemplateSize {
                template: tpl.name().to_string(),
                template_width: tpl.width(),
                template_height: tpl.height(),
                frame_width: width,
                frame_height: height,
            }),
            None => Ok(()),
        }
    }
}

/// Collects classes and validates them into a [`TemplateLibrary`].
#[derive(Debug, Default)]
pub struct LibraryBuilder {
    classes: Vec<(ClassSpec, Vec<TemplateSource>)>,
}

impl LibraryBuilder {
    /// Declares a class with its ordered templates.
    pub fn class(mut self, spec: ClassSpec, templates: Vec<TemplateSource>) -> Self {
        self.classes.push((spec, templates));
        self
    }

    /// Validates every class and compiles its templates.
    pub fn build(self) -> SpriteWatchResult<TemplateLibrary> {
        if self.classes.is_empty() {
            return Err(SpriteWatchError::InvalidInput(
                "template library needs at least one class",
            ));
        }

        let mut classes: Vec<ClassEntry> = Vec::with_capacity(self.classes.len());
        for (spec, sources) in self.classes {
            if classes.iter().any(|entry| entry.spec.class == spec.class) {
                return Err(SpriteWatchError::InvalidInput("duplicate object class"));
            }
            if sources.is_empty() {
                return Err(SpriteWatchError::InvalidInput(
                    "every class needs at least one template",
                ));
            }
            validate_threshold(spec.threshold)?;

            let mut templates = Vec::with_capacity(sources.len());
            for (index, source) in sources.into_iter().enumerate() {
                let mut template =
                    Template::new(&source.name, spec.class.clone(), source.image, spec.metric)?
                        .with_index(index);
                if let Some(threshold) = source.threshold {
                    validate_threshold(threshold)?;
                    template = template.with_threshold(threshold);
                }
                templates.push(template);
            }
            classes.push(ClassEntry { spec, templates });
        }

        Ok(TemplateLibrary { classes })
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassSpec, TemplateLibrary, TemplateSource};
    use crate::image::GrayImage;
    use crate::template::ObjectClass;
    use crate::util::SpriteWatchError;

    fn sprite(w: usize, h: usize) -> GrayImage {
        let data = (0..w * h).map(|i| (i * 7 % 251) as u8).collect();
        GrayImage::new(data, w, h).unwrap()
    }

    #[test]
    fn classes_keep_declaration_order() {
        let lib = TemplateLibrary::builder()
            .class(
                ClassSpec::new("runner"),
                vec![TemplateSource::new("run0", sprite(8, 8))],
            )
            .class(
                ClassSpec::new("bird"),
                vec![
                    TemplateSource::new("up", sprite(10, 6)),
                    TemplateSource::new("down", sprite(10, 7)),
                ],
            )
            .build()
            .unwrap();

        let names: Vec<&str> = lib.classes().map(|spec| spec.class.as_str()).collect();
        assert_eq!(names, vec!["runner", "bird"]);
        let birds = lib.templates_for(&ObjectClass::new("bird")).unwrap();
        assert_eq!(birds.len(), 2);
        assert_eq!((birds[1].name(), birds[1].index()), ("down", 1));
        assert_eq!(lib.max_template_size(), (10, 8));
    }

    #[test]
    fn rejects_bad_configuration() {
        let err = TemplateLibrary::builder()
            .class(ClassSpec::new("bird"), Vec::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, SpriteWatchError::InvalidInput(_)));

        let err = TemplateLibrary::builder()
            .class(
                ClassSpec::new("bird").with_threshold(1.5),
                vec![TemplateSource::new("up", sprite(4, 4))],
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, SpriteWatchError::InvalidInput(_)));

        let lib = TemplateLibrary::builder()
            .class(
                ClassSpec::new("bird"),
                vec![TemplateSource::new("up", sprite(4, 4))],
            )
            .build()
            .unwrap();
        assert_eq!(
            lib.templates_for(&ObjectClass::new("cactus")).unwrap_err(),
            SpriteWatchError::UnknownClass("cactus".to_string())
        );
    }
}
