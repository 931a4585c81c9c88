use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use config_manager::CamerasConfig;
use motion_recorder::{ffmpeg_worker, signals, Supervisor};
use tracing_subscriber::EnvFilter;

/// Motion Recorder
///
/// - Decodes each camera's low-quality stream and watches it for motion
/// - Records the high-quality stream while motion lasts
/// - Stops cleanly on SIGINT/SIGTERM, finalizing open recordings
#[derive(Parser)]
#[command(name = "motion-recorder")]
#[command(about = "Record RTSP cameras while they see motion")]
struct Cli {
    /// Camera config file (default: ~/.config/motion-recorder/cameras.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the config, list the cameras and exit
    #[arg(long)]
    check: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => CamerasConfig::load_from(path),
        None => CamerasConfig::load(),
    }
    .context("Failed to load camera configuration")?;

    // Run async runtime
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli, config))
}

async fn async_main(cli: Cli, config: CamerasConfig) -> Result<()> {
    if cli.check {
        println!("Recordings: {}", config.base_dir.display());
        println!(
            "Analysis frames: {}x{}",
            config.frame.width, config.frame.height
        );
        for camera in &config.cameras {
            println!(
                "  {} -> {}",
                camera.name,
                config.camera_dir(camera).display()
            );
        }
        match ffmpeg_recorder::ffmpeg_version(&config.ffmpeg.binary).await {
            Some(version) => println!("ffmpeg: {}", version),
            None => println!("ffmpeg: {} is not runnable", config.ffmpeg.binary),
        }
        return Ok(());
    }

    match ffmpeg_recorder::ffmpeg_version(&config.ffmpeg.binary).await {
        Some(version) => tracing::info!("Using {}", version),
        None => tracing::warn!(
            "{} is not runnable, cameras will stop immediately",
            config.ffmpeg.binary
        ),
    }

    let supervisor = Supervisor::new();
    let _signals = signals::install(supervisor.stop_handle())
        .context("Failed to install signal handlers")?;

    let mut workers = Vec::with_capacity(config.cameras.len());
    for camera in &config.cameras {
        workers.push(ffmpeg_worker(&config, camera).await);
    }

    let summary = supervisor.run(workers).await;
    tracing::info!("All cameras exited cleanly ({})", summary);
    Ok(())
}
