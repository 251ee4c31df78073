mod config;
mod control;
mod sink;
#[cfg(feature = "screen")]
mod screen;

use clap::Parser;
use config::{Config, SourceConfig};
use sink::ReportSink;
use spritewatch::image::io::load_frame;
use spritewatch::{
    ClassSource, DrawSwitch, FrameSource, PipelineDriver, ReplaySource, ScreenBounds,
    TemplateLibrary,
};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "SpriteWatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
    /// Stop after this many reported frames.
    #[arg(long, value_name = "N")]
    max_ticks: Option<u64>,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn build_source(source: &SourceConfig) -> CliResult<Box<dyn FrameSource>> {
    match source {
        SourceConfig::Replay { paths } => {
            if paths.is_empty() {
                return Err("source.paths must list at least one screenshot".into());
            }
            let screens = paths.iter().map(load_frame).collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(ReplaySource::new(screens)))
        }
        #[cfg(feature = "screen")]
        SourceConfig::Screen => Ok(Box::new(screen::ScreenSource::primary()?)),
        #[cfg(not(feature = "screen"))]
        SourceConfig::Screen => {
            Err("screen capture requires building spritewatch-cli with --features screen".into())
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("spritewatch=info".parse()?),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.classes.is_empty() {
        return Err("at least one class must be configured".into());
    }
    if cli.max_ticks == Some(0) {
        return Err("max-ticks must be at least 1".into());
    }

    let region = config.region.to_region()?;
    let screen = ScreenBounds::from(&config.screen);
    if !screen.contains(&region) {
        return Err(format!(
            "region {}x{}+{}+{} does not fit the {}x{} screen",
            region.width(),
            region.height(),
            region.left(),
            region.top(),
            screen.width,
            screen.height
        )
        .into());
    }

    let driver_cfg = config.driver_config();
    let classes: Vec<ClassSource> = config.classes.into_iter().map(ClassSource::from).collect();
    let library = Arc::new(TemplateLibrary::load(classes)?);
    tracing::info!(
        classes = library.class_count(),
        templates = library.template_count(),
        "template library loaded"
    );

    let source = build_source(&config.source)?;
    let mut driver = PipelineDriver::new(source, Arc::clone(&library), driver_cfg)?;
    driver.start(region)?;

    let (stop_tx, stop_rx) = mpsc::channel();
    let draw = DrawSwitch::new(config.draw.enabled);
    let mut sink = ReportSink::new(&library, draw.clone(), config.draw.output_dir.clone());
    if let Some(max_ticks) = cli.max_ticks {
        sink = sink.with_limit(max_ticks, stop_tx.clone());
    }

    let ctrlc_tx = stop_tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(());
    })?;

    let control_tx = stop_tx.clone();
    let region_handle = driver.region_handle();
    thread::Builder::new()
        .name("spritewatch-control".to_string())
        .spawn(move || {
            control::run_control(
                std::io::stdin().lock(),
                region_handle,
                screen,
                draw,
                control_tx,
            )
        })?;

    let cause = driver.run(&mut sink, &stop_rx)?;
    drop(stop_tx);
    tracing::info!(%cause, "driver stopped");
    if let Some(line) = sink.stop_line(&cause) {
        eprintln!("{line}");
    }
    Ok(())
}
