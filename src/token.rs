//! Where the Strava access token comes from.

use color_eyre::{eyre::eyre, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TOKEN_FILE: &str = "token";
const TOKEN_ENV: &str = "STRAVA_TOKEN";

pub trait TokenProvider {
  fn token(&self) -> Option<String>;
}

/// Token given on the command line.
pub struct ExplicitToken(pub Option<String>);

impl TokenProvider for ExplicitToken {
  fn token(&self) -> Option<String> {
    self.0.clone()
  }
}

/// Token stored in a file in the application directory.
pub struct FileToken {
  path: PathBuf,
}

impl FileToken {
  pub fn new(dir: &Path) -> Self {
    Self {
      path: dir.join(TOKEN_FILE),
    }
  }

  pub fn store(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    fs::write(&self.path, token.trim())
      .map_err(|e| eyre!("Failed to write token file {}: {}", self.path.display(), e))
  }
}

impl TokenProvider for FileToken {
  fn token(&self) -> Option<String> {
    fs::read_to_string(&self.path).ok()
  }
}

/// Token from `STRAVA_TOKEN`.
pub struct EnvToken;

impl TokenProvider for EnvToken {
  fn token(&self) -> Option<String> {
    std::env::var(TOKEN_ENV).ok()
  }
}

/// First provider with a non-empty token wins.
pub struct TokenChain {
  providers: Vec<Box<dyn TokenProvider>>,
}

impl TokenChain {
  pub fn new(providers: Vec<Box<dyn TokenProvider>>) -> Self {
    Self { providers }
  }

  /// `--token`, then the token file, then `STRAVA_TOKEN`.
  pub fn standard(explicit: Option<String>, app_dir: &Path) -> Self {
    Self::new(vec![
      Box::new(ExplicitToken(explicit)),
      Box::new(FileToken::new(app_dir)),
      Box::new(EnvToken),
    ])
  }

  pub fn resolve(&self) -> Result<String> {
    debug!("Resolving access token");
    self
      .providers
      .iter()
      .filter_map(|p| p.token())
      .map(|t| t.trim().to_string())
      .find(|t| !t.is_empty())
      .ok_or_else(|| {
        eyre!(
          "Strava access token not found. Pass --token, run `strava-cli set-token`, or set {}.",
          TOKEN_ENV
        )
      })
  }
}
