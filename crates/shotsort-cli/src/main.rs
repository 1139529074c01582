//! Shotsort - files screenshots and screen recordings into Google Drive.
//!
//! Runs one batch over the watch directory and prints a report. With
//! `--watch-interval` it keeps polling until interrupted.

use anyhow::Result;
use clap::Parser;
use shotsort_core::config::{DriveConfig, NamingConfig, NetworkConfig};
use shotsort_core::{
    parse_bool_flag, AgentConfig, DriveBackend, Orchestrator, RunReport, StopSignal,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "shotsort")]
#[command(about = "Name, sort and upload screenshots and screen recordings")]
struct Args {
    /// Directory to scan (defaults to ~/Desktop)
    #[arg(long, env = "WATCH_DIR")]
    watch_dir: Option<PathBuf>,

    /// Name files with the vision model; 0, false or no disables it
    #[arg(long, env = "ANALYZE_IMAGES", default_value = "true")]
    analyze_images: String,

    /// Skip vision naming regardless of ANALYZE_IMAGES
    #[arg(long)]
    no_analyze: bool,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_API_URL", default_value = NetworkConfig::DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Vision model name
    #[arg(long, env = "VISION_MODEL", default_value = NetworkConfig::DEFAULT_VISION_MODEL)]
    vision_model: String,

    /// OAuth client secrets file
    #[arg(long, env = "GOOGLE_CREDENTIALS", default_value = DriveConfig::DEFAULT_CREDENTIALS_FILE)]
    credentials: PathBuf,

    /// Authorized-user token file
    #[arg(long, env = "GOOGLE_TOKEN", default_value = DriveConfig::DEFAULT_TOKEN_FILE)]
    token: PathBuf,

    /// ffmpeg executable used for video frames
    #[arg(long, default_value = NamingConfig::DEFAULT_FFMPEG)]
    ffmpeg: PathBuf,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Keep polling, scanning again every SECS seconds
    #[arg(long, value_name = "SECS")]
    watch_interval: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn to_config(&self) -> Result<AgentConfig> {
        let watch_dir = match &self.watch_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory; pass --watch-dir"))?
                .join("Desktop"),
        };

        let mut config = AgentConfig::new(watch_dir)
            .with_analyze_images(!self.no_analyze && parse_bool_flag(&self.analyze_images))
            .with_ollama(&self.ollama_url, &self.vision_model)
            .with_credentials(&self.credentials, &self.token);
        config.ffmpeg_path = self.ffmpeg.clone();
        Ok(config)
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_table());
    }
    Ok(())
}

/// Connect to Drive. With `retry_every` set, recoverable failures such as
/// an unreachable token endpoint are retried; startup errors abort.
async fn connect(config: &AgentConfig, retry_every: Option<Duration>) -> Result<DriveBackend> {
    loop {
        let err = match DriveBackend::connect(config).await {
            Ok(backend) => return Ok(backend),
            Err(e) => e,
        };
        match retry_every {
            Some(delay) if !err.is_fatal() => {
                warn!("Cannot reach Google Drive: {}; retrying in {}s", err, delay.as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted before connecting"),
                }
            }
            _ => {
                error!("Cannot start: {}", err);
                return Err(err.into());
            }
        }
    }
}

/// First Ctrl-C stops after the current file; a second one exits at once.
fn spawn_interrupt_listener(stop: StopSignal) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if stop.request_stop() {
                warn!("Second interrupt, exiting without finishing the current file");
                std::process::exit(130);
            }
            info!("Interrupt received, stopping after the current file (Ctrl-C again to quit)");
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the report
    if std::env::var_os("RUST_LOG").is_some() {
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    } else {
        let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
        FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .compact()
            .init();
    }

    let config = args.to_config()?;
    info!("Watching {}", config.watch_dir.display());

    let interval = args.watch_interval.map(Duration::from_secs);
    let backend = Arc::new(connect(&config, interval).await?);
    let mut orchestrator = Orchestrator::from_config(&config, backend)?;
    if !orchestrator.naming_enabled() {
        info!("Vision naming disabled");
    }

    let stop = orchestrator.stop_signal();
    spawn_interrupt_listener(stop.clone());

    loop {
        let report = orchestrator.run_batch().await;
        print_report(&report, args.json)?;

        let Some(delay) = interval else {
            break;
        };
        if stop.is_requested() {
            break;
        }

        // the listener records the interrupt; just stop waiting
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        if stop.is_requested() {
            break;
        }
    }

    info!("Done");
    Ok(())
}
