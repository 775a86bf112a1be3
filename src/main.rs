//! subburn - caption a video, translate the captions, burn them in
//!
//! Entry point: parses the command line, sets up logging, loads the
//! configuration and runs one video through the pipeline.

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subburn::cli::Args;
use subburn::config::{Config, FailurePolicy};
use subburn::pipeline::{Pipeline, PipelineReport, StageOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting subburn");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    if args.abort_on_failure {
        config.pipeline.failure_policy = FailurePolicy::AbortEarly;
    }

    let (source_lang, defaulted) = args.source_language();
    if defaulted {
        info!("No source language given, assuming '{}'", source_lang);
    }

    let request = args.to_request(&config);
    let pipeline = Pipeline::new(&config)?;

    if let Err(e) = pipeline.check_dependencies().await {
        warn!("Dependency check failed: {}", e);
    }

    let report = pipeline.run(&request).await?;
    print_summary(&report);

    if !report.is_success() {
        anyhow::bail!("{} stage(s) failed", report.failed_stages().len());
    }

    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!("\nRun {}", report.run_id);
    for stage in &report.stages {
        let status = match &stage.outcome {
            StageOutcome::Completed => "ok".to_string(),
            StageOutcome::Skipped => "skipped".to_string(),
            StageOutcome::Failed(e) => format!("failed: {}", e),
        };
        println!("  {:<22} {}", stage.stage.to_string(), status);
    }

    println!("  Segments:     {}", report.segment_count);
    match report.burned_entries {
        Some(entries) => println!("  Burned:       {} entries", entries),
        None => println!("  Burned:       no readable subtitle file"),
    }
    println!("  Checkpoint:   {}", report.checkpoint_path.display());
    println!("  Subtitles:    {}", report.subtitle_path.display());
    println!("  Video:        {}", report.output_video_path.display());
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".subburn").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "subburn.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Flushing worker must outlive main
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("subburn.log").display());
    Ok(())
}
