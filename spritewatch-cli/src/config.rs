use serde::Deserialize;
use spritewatch::{
    AggregatorConfig, CaptureRegion, ClassSource, ClassSpec, DriverConfig, MatchConfig, MatchMode,
    Metric, RenderStyle, ScreenBounds, SpriteWatchResult,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricConfig {
    Ncc,
    Zncc,
}

impl From<MetricConfig> for Metric {
    fn from(value: MetricConfig) -> Self {
        match value {
            MetricConfig::Ncc => Metric::Ncc,
            MetricConfig::Zncc => Metric::Zncc,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeConfig {
    Best,
    All,
}

impl From<ModeConfig> for MatchMode {
    fn from(value: ModeConfig) -> Self {
        match value {
            ModeConfig::Best => MatchMode::Best,
            ModeConfig::All => MatchMode::All,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegionJson {
    pub top: i64,
    pub left: i64,
    pub width: i64,
    pub height: i64,
}

impl Default for RegionJson {
    fn default() -> Self {
        let region = CaptureRegion::default();
        Self {
            top: region.top() as i64,
            left: region.left() as i64,
            width: region.width() as i64,
            height: region.height() as i64,
        }
    }
}

impl RegionJson {
    pub fn to_region(&self) -> SpriteWatchResult<CaptureRegion> {
        CaptureRegion::new(self.top, self.left, self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScreenJson {
    pub width: usize,
    pub height: usize,
}

impl Default for ScreenJson {
    fn default() -> Self {
        let bounds = ScreenBounds::default();
        Self {
            width: bounds.width,
            height: bounds.height,
        }
    }
}

impl From<&ScreenJson> for ScreenBounds {
    fn from(value: &ScreenJson) -> Self {
        ScreenBounds::new(value.width, value.height)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Screenshots replayed in a loop.
    Replay { paths: Vec<PathBuf> },
    /// The primary monitor (requires the `screen` feature).
    Screen,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Replay { paths: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AggregateJson {
    pub overlap_threshold: f32,
    pub parallel: bool,
    pub parallel_rows: bool,
    pub min_var_i: f32,
}

impl Default for AggregateJson {
    fn default() -> Self {
        let cfg = AggregatorConfig::default();
        Self {
            overlap_threshold: cfg.overlap_threshold,
            parallel: cfg.parallel,
            parallel_rows: cfg.matcher.parallel,
            min_var_i: cfg.matcher.min_var_i,
        }
    }
}

impl From<&AggregateJson> for AggregatorConfig {
    fn from(value: &AggregateJson) -> Self {
        AggregatorConfig {
            overlap_threshold: value.overlap_threshold,
            parallel: value.parallel,
            matcher: MatchConfig {
                parallel: value.parallel_rows,
                min_var_i: value.min_var_i,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DrawJson {
    pub enabled: bool,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StyleJson {
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for StyleJson {
    fn default() -> Self {
        let style = RenderStyle::default();
        Self {
            color: style.color,
            thickness: style.thickness,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassJson {
    pub name: String,
    pub templates: Vec<PathBuf>,
    pub threshold: Option<f32>,
    pub mode: Option<ModeConfig>,
    pub metric: Option<MetricConfig>,
    #[serde(default)]
    pub style: StyleJson,
}

impl From<ClassJson> for ClassSource {
    fn from(value: ClassJson) -> Self {
        let mut spec = ClassSpec::new(&value.name).with_style(RenderStyle {
            color: value.style.color,
            thickness: value.style.thickness,
        });
        if let Some(threshold) = value.threshold {
            spec = spec.with_threshold(threshold);
        }
        if let Some(mode) = value.mode {
            spec = spec.with_mode(mode.into());
        }
        if let Some(metric) = value.metric {
            spec = spec.with_metric(metric.into());
        }
        ClassSource {
            spec,
            paths: value.templates,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub region: RegionJson,
    pub screen: ScreenJson,
    pub period_ms: u64,
    pub max_consecutive_failures: usize,
    pub source: SourceConfig,
    pub aggregate: AggregateJson,
    pub draw: DrawJson,
    pub classes: Vec<ClassJson>,
}

impl Default for Config {
    fn default() -> Self {
        let driver = DriverConfig::default();
        Self {
            region: RegionJson::default(),
            screen: ScreenJson::default(),
            period_ms: driver.period.as_millis() as u64,
            max_consecutive_failures: driver.max_consecutive_failures,
            source: SourceConfig::default(),
            aggregate: AggregateJson::default(),
            draw: DrawJson::default(),
            classes: Vec::new(),
        }
    }
}

impl Config {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            period: Duration::from_millis(self.period_ms),
            max_consecutive_failures: self.max_consecutive_failures,
            aggregator: (&self.aggregate).into(),
        }
    }
}
