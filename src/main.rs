mod app;
mod cache;
mod config;
mod fields;
mod filter;
mod format;
mod logging;
mod strava;
mod sync;
#[cfg(test)]
mod testing;
mod token;

use clap::Parser;
use color_eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::app::{App, Command};
use crate::cache::JsonFileStorage;
use crate::strava::cached_client::CachedStrava;
use crate::strava::client::StravaClient;
use crate::token::TokenChain;

#[derive(Parser, Debug)]
#[command(name = "strava-cli")]
#[command(about = "Command line access to your Strava activities, backed by a local cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./strava-cli.yaml or ~/.strava-cli/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Strava access token (default: ~/.strava-cli/token or $STRAVA_TOKEN)
  #[arg(short, long, global = true)]
  token: Option<String>,

  /// Directory holding the activity cache
  #[arg(long, global = true)]
  cache_dir: Option<PathBuf>,

  /// Log debug output to ~/.strava-cli/strava-cli.log
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let app_dir = config::app_dir()?;
  let _guard = logging::init(&app_dir, args.verbose)?;
  debug!(command = ?args.command, "Starting");

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override cache location if specified on command line
  if let Some(dir) = args.cache_dir {
    config.cache_dir = Some(dir);
  }

  // Local commands must work before a token exists
  let token = if args.command.needs_token() {
    TokenChain::standard(args.token, &app_dir).resolve()?
  } else {
    String::new()
  };

  let client = StravaClient::new(&config, token)?;
  let storage = JsonFileStorage::new(config.cache_dir()?);
  debug!(path = %storage.path().display(), "Using cache file");
  let strava = CachedStrava::new(client, storage);

  let mut app = App::new(config, app_dir, strava);
  let stdout = std::io::stdout();
  let mut out = stdout.lock();
  app.run(args.command, &mut out).await?;
  out.flush()?;

  Ok(())
}
