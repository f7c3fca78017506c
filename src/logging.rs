//! File logging, so stdout carries nothing but command output.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE: &str = "strava-cli.log";

/// Overrides the default level, e.g. `STRAVA_CLI_LOG=strava_cli=trace`.
const LOG_ENV: &str = "STRAVA_CLI_LOG";

/// Install a subscriber appending to `dir/strava-cli.log`.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(dir: &Path, verbose: bool) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let default_level = if verbose { "debug" } else { "info" };
  let filter =
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
