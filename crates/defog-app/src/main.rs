//! Defog - command-line video dehazer
//!
//! Entry point: parses arguments, resolves the dehazing configuration and
//! streams the input video through the sequence processor into the encoder.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use defog_core::DehazeConfig;
use defog_dehaze::FrameSequenceProcessor;
use defog_media::{MediaProbe, VideoDecoder, VideoEncoder};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = resolve_config(&cli)?;
    if cli.print_config {
        let json = config.to_json().context("Failed to serialize configuration")?;
        println!("{}", String::from_utf8_lossy(&json));
        return Ok(());
    }

    defog_media::init();
    run(&cli, config)
}

/// Defaults, then the config file, then flags.
fn resolve_config(cli: &Cli) -> Result<DehazeConfig> {
    let base = match &cli.config {
        Some(path) => DehazeConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DehazeConfig::default(),
    };
    let config = cli.apply_overrides(base);
    config.validate().context("Invalid dehazing parameters")?;
    Ok(config)
}

fn run(cli: &Cli, config: DehazeConfig) -> Result<()> {
    let probe = MediaProbe::probe(&cli.input)
        .with_context(|| format!("Failed to probe {}", cli.input.display()))?;
    if let Some(video) = probe.primary_video() {
        info!(
            codec = %video.codec,
            width = video.width,
            height = video.height,
            pix_fmt = %video.pixel_format,
            "Input video stream"
        );
    }

    let mut decoder = VideoDecoder::open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;
    if let Some(expected) = cli.extension_mismatch() {
        warn!(
            output = %cli.output.display(),
            expected = expected,
            "Output extension does not match the chosen codec"
        );
    }
    let mut encoder = VideoEncoder::create(cli.output.clone(), cli.encoder_settings());
    let mut processor = FrameSequenceProcessor::new(config)?;

    let result = processor.run_with_progress(&mut decoder, &mut encoder, |progress| {
        info!(
            frames = progress.frames_done,
            fps = %format!("{:.1}", progress.fps),
            media_time = %progress.media_time,
            "Progress"
        );
    });

    match result {
        Ok(report) => {
            info!(
                frames = report.frames,
                width = report.width,
                height = report.height,
                light = ?report.light.channels(),
                output = %cli.output.display(),
                "Dehazed video written"
            );
            Ok(())
        }
        Err(e) => {
            // Only a spawned FFmpeg can have written to OUTPUT.
            let started = encoder.is_started();
            drop(encoder);
            if started && cli.output.exists() {
                if let Err(rm) = std::fs::remove_file(&cli.output) {
                    warn!(error = %rm, "Failed to remove partial output");
                }
            }
            Err(e).with_context(|| format!("Failed to dehaze {}", cli.input.display()))
        }
    }
}
