mod actor;
mod app;
mod bit;
mod bite;
mod collision;
mod config;
mod entity;
mod grid;
mod input;
mod item;
mod level;
mod object;
mod player;
mod profile;
mod render;
mod scores;
mod session;
mod theme;
mod world;

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs::OpenOptions, path::Path, sync::Mutex};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let paths = config::project_paths()?;
    let log_path = cli.log.clone().unwrap_or_else(|| paths.log_path.clone());
    init_tracing(&log_path)?;
    tracing::info!(log = %log_path.display(), "snakebit starting");
    app::run(cli, paths).await
}

/// The terminal belongs to the renderer, so logs go to a file.
fn init_tracing(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
