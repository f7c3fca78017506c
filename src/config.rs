use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::strava::types::StreamType;

/// Directory name under $HOME holding the cache, token, log and config.
const APP_DIR: &str = ".strava-cli";

pub const DEFAULT_API_URL: &str = "https://www.strava.com/api/v3";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Where the cache file lives (defaults to ~/.strava-cli)
  pub cache_dir: Option<PathBuf>,
  pub api_url: String,
  /// Sleep after every API request
  pub request_delay_ms: Option<u64>,
  /// Streams fetched by `streams` when --types is not given
  pub stream_types: Vec<StreamType>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cache_dir: None,
      api_url: DEFAULT_API_URL.to_string(),
      request_delay_ms: None,
      stream_types: vec![StreamType::Time, StreamType::Latlng, StreamType::Altitude],
    }
  }
}

/// The application directory, `~/.strava-cli`.
pub fn app_dir() -> Result<PathBuf> {
  dirs::home_dir()
    .map(|home| home.join(APP_DIR))
    .ok_or_else(|| eyre!("Could not determine home directory"))
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./strava-cli.yaml (current directory)
  /// 3. ~/.strava-cli/config.yaml
  ///
  /// No file at all means defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("strava-cli.yaml");
    if local.exists() {
      return Some(local);
    }

    app_dir()
      .ok()
      .map(|dir| dir.join("config.yaml"))
      .filter(|p| p.exists())
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty YAML document is null, not a mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    config.api_url()?;
    Ok(config)
  }

  /// Directory holding the cache file.
  pub fn cache_dir(&self) -> Result<PathBuf> {
    match &self.cache_dir {
      Some(dir) => Ok(dir.clone()),
      None => app_dir(),
    }
  }

  pub fn api_url(&self) -> Result<Url> {
    Url::parse(&self.api_url).map_err(|e| eyre!("Invalid api_url '{}': {}", self.api_url, e))
  }

  pub fn request_delay(&self) -> Option<Duration> {
    self.request_delay_ms.map(Duration::from_millis)
  }
}
