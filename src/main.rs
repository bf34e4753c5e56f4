use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use bottlesight::AppConfig;

#[derive(Parser)]
#[command(name = "bottlesight")]
#[command(about = "Real-time bottle, cap and brand recognition from a webcam feed")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Camera device index (negative selects the synthetic test source)
    #[arg(long, value_name = "ID")]
    camera_id: Option<i32>,

    /// Verify that the configured model files exist, then exit
    #[arg(long)]
    check_models: bool,

    /// Force CPU inference even when GPU support is configured
    #[arg(long)]
    cpu: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(id) = args.camera_id {
        config.camera.device_id = id;
    }
    if args.cpu {
        config.processing.enable_gpu = false;
    }
    log::debug!("effective configuration: {config:#?}");

    if args.check_models {
        return check_models(&config);
    }

    run_app(config)
}

fn check_models(config: &AppConfig) -> Result<()> {
    let mut all_found = true;
    for (name, path, found) in config.model_status() {
        let mark = if found { "ok" } else { "MISSING" };
        println!("{name:>17}  {mark:>7}  {}", path.display());
        all_found &= found;
    }
    if !all_found {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "gui")]
fn run_app(config: AppConfig) -> Result<()> {
    bottlesight::gui::run(config).map_err(|err| anyhow::anyhow!("gui error: {err}"))
}

/// Headless fallback: run a short detection loop against the configured
/// source and report per-frame counts on the log.
#[cfg(not(feature = "gui"))]
fn run_app(config: AppConfig) -> Result<()> {
    use bottlesight::camera;
    use bottlesight::pipeline::{DetectionOptions, DetectionPipeline};
    use bottlesight::stats::SessionStats;

    const DEMO_FRAMES: u32 = 60;

    let pipeline = DetectionPipeline::load(&config)?;
    let options = DetectionOptions::from_config(&config);
    let mut source = camera::open_source(&config.camera)?;
    let mut stats = SessionStats::new();

    log::info!("headless run: {} frames from {}", DEMO_FRAMES, source.describe());
    for _ in 0..DEMO_FRAMES {
        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame capture failed: {err:#}");
                continue;
            }
        };
        let result = pipeline.process_frame(&frame, &options);
        let counts = result.counts();
        log::debug!(
            "bottles={} with_cap={} without_cap={}",
            counts.bottles,
            counts.with_cap,
            counts.without_cap
        );
        stats.record(&counts, &result.brands());
    }

    let summary = stats.summary();
    log::info!(
        "done: {} frames, {} bottles ({} with cap, {} without), {:.1} fps",
        summary.total_frames,
        summary.bottles,
        summary.with_cap,
        summary.without_cap,
        summary.avg_fps
    );
    Ok(())
}
