use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::filter::Filter;
use crate::format::{self, Formatter};
use crate::strava::cached_client::CachedStrava;
use crate::strava::source::RemoteSource;
use crate::strava::types::{ActivityUpdate, StreamType};
use crate::sync::telemetry::TelemetryAssembler;
use crate::sync::SyncMode;
use crate::token::FileToken;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
  /// List activities, newest first
  Activities {
    /// Filter as key=value (before, after, trainer, private, commute)
    #[arg(short, long = "filter")]
    filters: Vec<String>,

    /// Print only activity ids
    #[arg(short, long)]
    quiet: bool,

    /// Do not look for new activities when the cache exists
    #[arg(long)]
    cached: bool,
  },

  /// Show the full record of one activity as JSON
  Activity { id: i64 },

  /// Show the telemetry of one activity
  Streams {
    id: i64,

    /// Comma separated stream types (default: from config)
    #[arg(long)]
    types: Option<String>,

    /// One JSON object per sample
    #[arg(long)]
    json: bool,
  },

  /// Update one or more activities
  Update {
    #[arg(required = true)]
    ids: Vec<i64>,

    /// Field as key=value (name, sport_type, type, description, trainer, commute,
    /// hide_from_home, gear_id)
    #[arg(short, long = "set", required = true)]
    set: Vec<String>,
  },

  /// List the athlete's bikes
  Bikes,

  /// List the athlete's shoes
  Shoes,

  /// Delete the local activity cache
  ClearCache,

  /// Store an access token for later runs
  SetToken { token: String },
}

impl Command {
  /// Whether the command talks to Strava.
  pub fn needs_token(&self) -> bool {
    !matches!(self, Command::ClearCache | Command::SetToken { .. })
  }
}

/// Runs one command against a cached Strava client.
pub struct App<R: RemoteSource, S: CacheStorage> {
  config: Config,
  app_dir: PathBuf,
  strava: CachedStrava<R, S>,
}

impl<R: RemoteSource, S: CacheStorage> App<R, S> {
  pub fn new(config: Config, app_dir: PathBuf, strava: CachedStrava<R, S>) -> Self {
    Self {
      config,
      app_dir,
      strava,
    }
  }

  pub async fn run(&mut self, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
      Command::Activities {
        filters,
        quiet,
        cached,
      } => self.list_activities(&filters, quiet, cached, out).await,
      Command::Activity { id } => self.show_activity(id, out).await,
      Command::Streams { id, types, json } => {
        self.show_streams(id, types.as_deref(), json, out).await
      }
      Command::Update { ids, set } => self.update_activities(&ids, &set, out).await,
      Command::Bikes => {
        for bike in self.strava.bikes().await? {
          writeln!(out, "{}", format::gear(&bike))?;
        }
        Ok(())
      }
      Command::Shoes => {
        for shoe in self.strava.shoes().await? {
          writeln!(out, "{}", format::gear(&shoe))?;
        }
        Ok(())
      }
      Command::ClearCache => {
        self.strava.clear_cache()?;
        info!("Cache cleared");
        Ok(())
      }
      Command::SetToken { token } => {
        FileToken::new(&self.app_dir).store(&token)?;
        info!("Access token stored");
        Ok(())
      }
    }
  }

  async fn list_activities(
    &mut self,
    filters: &[String],
    quiet: bool,
    cached: bool,
    out: &mut impl Write,
  ) -> Result<()> {
    // Parse before syncing so a typo never costs a round of requests
    let filter = Filter::parse(filters)?;
    let formatter = Formatter::new(quiet);
    let mode = if cached {
      SyncMode::CachedOnly
    } else {
      SyncMode::Incremental
    };

    for activity in self.strava.activities(mode).await? {
      if filter.matches(activity) {
        writeln!(out, "{}", formatter.activity(activity))?;
      }
    }
    Ok(())
  }

  async fn show_activity(&mut self, id: i64, out: &mut impl Write) -> Result<()> {
    let detail = self.strava.detail(id).await?;
    let json = serde_json::to_string_pretty(&detail)
      .map_err(|e| eyre!("Failed to encode activity {}: {}", id, e))?;
    writeln!(out, "{}", json)?;
    Ok(())
  }

  async fn show_streams(
    &mut self,
    id: i64,
    types: Option<&str>,
    json: bool,
    out: &mut impl Write,
  ) -> Result<()> {
    let types = match types {
      Some(list) => parse_stream_types(list)?,
      None => self.config.stream_types.clone(),
    };
    let assembler = TelemetryAssembler::new(&types);
    let (_, samples) = self.strava.telemetry(id, &assembler).await?;

    if json {
      for sample in &samples {
        let line = serde_json::to_string(sample)
          .map_err(|e| eyre!("Failed to encode sample: {}", e))?;
        writeln!(out, "{}", line)?;
      }
    } else {
      writeln!(out, "{}", format::SAMPLE_HEADER)?;
      for sample in &samples {
        writeln!(out, "{}", format::sample(sample))?;
      }
    }
    Ok(())
  }

  async fn update_activities(
    &mut self,
    ids: &[i64],
    assignments: &[String],
    out: &mut impl Write,
  ) -> Result<()> {
    let update = ActivityUpdate::from_assignments(assignments)?;
    if update.is_empty() {
      return Err(eyre!("Nothing to update"));
    }

    for &id in ids {
      let cached = self.strava.update_activity(id, &update).await?;
      if !cached {
        warn!(id, "Updated activity is not in the cache");
      }
      writeln!(out, "{}", id)?;
    }
    Ok(())
  }
}

fn parse_stream_types(list: &str) -> Result<Vec<StreamType>> {
  list
    .split(',')
    .filter(|s| !s.trim().is_empty())
    .map(str::parse)
    .collect()
}
