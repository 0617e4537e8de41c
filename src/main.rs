use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use inner_bloom::BloomEngine;
use inner_bloom::bloom::BuildStats;
use inner_bloom::config::Configuration;
use inner_bloom::events::ParamChange;
use inner_bloom::gpu::OffscreenRenderer;
use inner_bloom::processing::orientation::load_source_image;
use inner_bloom::tasks;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Duration as TokioDuration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "inner-bloom",
    version,
    about = "Turns a photo into a rippling point-cloud bloom"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Photo to bloom (overrides `image` in the config)
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,
    /// Deterministic RNG seed (overrides `seed` in the config)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
    /// Write build statistics as JSON
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,
    /// Render a frame to this PNG after every build
    #[arg(long, value_name = "FILE")]
    render: Option<PathBuf>,
    /// Animation time of the rendered frame, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    time: f32,
    #[arg(long, default_value_t = 1280)]
    width: u32,
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Keep running and apply edits of the config file live
    #[arg(long)]
    watch: bool,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    image: &'a Path,
    generation: u64,
    #[serde(flatten)]
    stats: BuildStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    // init tracing (RUST_LOG controls level, default = info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    let mut cfg = Configuration::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if args.image.is_some() {
        cfg.image = args.image.clone();
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    tracing::debug!("Loaded configuration from {}:\n{:#?}", args.config.display(), cfg);

    let image_path = cfg
        .image
        .clone()
        .ok_or_else(|| anyhow!("no image configured; pass --image or set `image`"))?;
    let source = load_source_image(&image_path)
        .with_context(|| format!("failed to load {}", image_path.display()))?;

    let mut engine = BloomEngine::new(&cfg);
    let stats = engine.load_image(&source).context("initial build failed")?;
    let renderer = match &args.render {
        Some(_) => Some(OffscreenRenderer::new().context("offscreen renderer")?),
        None => None,
    };
    emit(&args, &image_path, &engine, stats, renderer.as_ref())?;

    if !args.watch {
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let (change_tx, mut change_rx) = mpsc::channel::<ParamChange>(32);
    let watcher = tokio::spawn(tasks::watch::run(
        args.config.clone(),
        engine.params().clone(),
        change_tx,
        cancel.clone(),
    ));

    let mut ticker = interval(TokioDuration::from_millis(50));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(change) = change_rx.recv() => {
                engine.set(change);
            }
            _ = ticker.tick() => {
                if let Some(stats) = engine.tick(Instant::now())? {
                    emit(&args, &image_path, &engine, stats, renderer.as_ref())?;
                }
            }
        }
    }

    watcher.await.context("config watcher panicked")??;
    Ok(())
}

fn emit(
    args: &Args,
    image: &Path,
    engine: &BloomEngine,
    stats: BuildStats,
    renderer: Option<&OffscreenRenderer>,
) -> Result<()> {
    if let Some(path) = &args.summary {
        let summary = Summary {
            image,
            generation: engine.scene().generation(),
            stats,
        };
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
    }
    if let (Some(path), Some(renderer)) = (&args.render, renderer) {
        let frame = renderer.render(&engine.scene(), args.time, args.width, args.height)?;
        frame
            .save(path)
            .with_context(|| format!("failed to write frame {}", path.display()))?;
        tracing::info!(path = %path.display(), "frame written");
    }
    Ok(())
}
