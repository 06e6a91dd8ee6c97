//! avmerge - audio/video merge service
//!
//! Entry point: parses the command line, loads configuration, sets up
//! logging and dispatches to the HTTP service or one of the one-shot
//! commands.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_appender::{non_blocking, rolling};

use avmerge::cli::{Args, Commands};
use avmerge::config::{Config, LoggingConfig};
use avmerge::model::MergeRequest;
use avmerge::server;
use avmerge::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    setup_logging(&config.logging, args.verbose)?;

    match args.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            info!("Starting avmerge service");
            server::run(config).await?;
        }
        Commands::Merge { video_url, audio_url, output } => {
            let request = MergeRequest::new(video_url, audio_url)?;
            let workflow = Workflow::new(config)?;
            workflow.media().check_availability().await?;

            let outcome = workflow.merge(&request).await?;
            move_file(&outcome.path, &output)
                .await
                .with_context(|| format!("Failed to move result to {}", output.display()))?;

            println!("Merged {} bytes into {}", outcome.size, output.display());
        }
        Commands::Check => {
            let workflow = Workflow::new(config)?;
            let version = workflow.media().get_version_info().await?;
            println!("{}", version);
        }
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

/// Setup logging to the console and, when enabled, a daily rolling file
fn setup_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = if logging.file {
        std::fs::create_dir_all(&logging.directory)?;
        let file_appender = rolling::daily(&logging.directory, "avmerge.log");
        let (non_blocking_file, guard) = non_blocking(file_appender);
        // Keep the guard alive for the duration of the program
        std::mem::forget(guard);

        Some(
            fmt::layer()
                .with_writer(non_blocking_file)
                .with_target(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - level: {}, file: {}", log_level, logging.file);
    Ok(())
}

/// Move across filesystems when a plain rename is not possible
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(from, to).await?;
    if let Err(error) = tokio::fs::remove_file(from).await {
        warn!(path = %from.display(), %error, "Failed to remove merged file after copy");
    }
    Ok(())
}
