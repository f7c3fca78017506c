//! Core traits and types for the caching system.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::strava::types::{Activity, ActivityDetail};

/// Everything the cache holds, as written to disk.
///
/// Missing top-level keys deserialize to empty defaults so files written by
/// older or newer versions still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSnapshot {
  /// Newest first, by `start_date`
  pub activities: Vec<Activity>,
  /// Lazily fetched details, keyed by activity id
  pub activity_details: BTreeMap<i64, ActivityDetail>,
}

/// Trait for cache storage backends.
///
/// A backend stores exactly one snapshot. It does no memoization of its own;
/// that is the job of [`super::CacheStore`].
pub trait CacheStorage {
  /// Whether a stored snapshot exists at all.
  fn exists(&self) -> bool;

  /// Read the stored snapshot. Fails if it is missing or unreadable.
  fn load(&self) -> Result<CacheSnapshot>;

  /// Replace the stored snapshot. Readers must only ever observe the old or
  /// the new snapshot in full.
  fn store(&self, snapshot: &CacheSnapshot) -> Result<()>;

  /// Delete the stored snapshot. No-op if there is none.
  fn remove(&self) -> Result<()>;
}
