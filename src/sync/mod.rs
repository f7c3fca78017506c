//! Keeps the local activity cache in step with Strava.
//!
//! The first sync pages through every activity (bootstrap). Every later sync
//! asks only for activities newer than the newest cached one (the watermark)
//! and prepends them. A short page, including an empty one, is the only end
//! of data signal; the API never reports a total.

pub mod detail;
pub mod telemetry;

use color_eyre::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::cache::{CacheStorage, CacheStore};
use crate::strava::source::RemoteSource;
use crate::strava::types::Activity;

/// Activities requested per page.
pub const PAGE_SIZE: u32 = 30;

/// Whether a collection read may go to the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
  /// Bootstrap if needed, otherwise fetch everything newer than the cache
  #[default]
  Incremental,
  /// Bootstrap if needed, otherwise serve the cache as is
  CachedOnly,
}

/// What a sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
  /// Cache was empty and has been filled from scratch
  Bootstrap,
  /// Newer activities were fetched and merged in
  Incremental,
  /// Cache served without contacting the network
  Cached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
  pub source: SyncSource,
  /// Activities received from the remote
  pub fetched: usize,
  /// Pages requested
  pub pages: u32,
}

/// Drives the bootstrap and incremental pagination loops.
pub struct SyncEngine {
  page_size: u32,
}

impl Default for SyncEngine {
  fn default() -> Self {
    Self {
      page_size: PAGE_SIZE,
    }
  }
}

impl SyncEngine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bring `cache` up to date with `remote`.
  ///
  /// Nothing is written unless the whole pagination loop succeeds; a failed
  /// request leaves the stored cache exactly as it was.
  pub async fn sync<R, S>(
    &self,
    remote: &R,
    cache: &mut CacheStore<S>,
    mode: SyncMode,
  ) -> Result<SyncReport>
  where
    R: RemoteSource,
    S: CacheStorage,
  {
    if !cache.is_initialized() {
      return self.bootstrap(remote, cache).await;
    }

    match mode {
      SyncMode::Incremental => self.update(remote, cache).await,
      SyncMode::CachedOnly => Ok(SyncReport {
        source: SyncSource::Cached,
        fetched: 0,
        pages: 0,
      }),
    }
  }

  /// Fetch every activity, newest first, and replace the cache contents.
  async fn bootstrap<R, S>(&self, remote: &R, cache: &mut CacheStore<S>) -> Result<SyncReport>
  where
    R: RemoteSource,
    S: CacheStorage,
  {
    info!("Initializing cache");
    let mut all = Vec::new();
    let mut page = 1;

    loop {
      info!(page, per_page = self.page_size, "Loading page");
      let activities = remote.list_page(page, self.page_size).await?;
      let count = activities.len();
      debug!(count, "activities loaded");
      all.extend(activities);

      if count < self.page_size as usize {
        debug!("No more activities to load");
        break;
      }
      page += 1;
    }

    let fetched = all.len();
    cache.replace_activities(all)?;
    info!(fetched, "Cache initialized");

    Ok(SyncReport {
      source: SyncSource::Bootstrap,
      fetched,
      pages: page,
    })
  }

  /// Fetch activities newer than the cached ones and prepend them.
  async fn update<R, S>(&self, remote: &R, cache: &mut CacheStore<S>) -> Result<SyncReport>
  where
    R: RemoteSource,
    S: CacheStorage,
  {
    let after = watermark(cache.activities());
    debug!(after, "Newest activity in cache");

    let mut new_activities = Vec::new();
    let mut page = 1;

    loop {
      info!(page, per_page = self.page_size, "Loading page");
      let activities = remote.list_after(after, page, self.page_size).await?;
      let count = activities.len();
      debug!(count, "activities loaded");
      new_activities.extend(activities);

      if count < self.page_size as usize {
        debug!("No more activities to load");
        break;
      }
      page += 1;
    }

    let fetched = new_activities.len();
    if fetched > 0 {
      // Pages come oldest first; the cache is newest first
      new_activities.reverse();
      let merged = merge(new_activities, cache.activities());
      cache.replace_activities(merged)?;
      info!(fetched, "Cache updated");
    }

    Ok(SyncReport {
      source: SyncSource::Incremental,
      fetched,
      pages: page,
    })
  }
}

/// Newest `start_date` among `activities` as epoch seconds, 0 if none.
///
/// Uses the canonical UTC start time; the local one would shift the boundary
/// by the athlete's timezone offset.
pub fn watermark(activities: &[Activity]) -> i64 {
  activities
    .iter()
    .filter_map(|a| {
      let started = a.started_at();
      if started.is_none() {
        warn!(id = a.id, start_date = %a.start_date, "Unparseable start_date");
      }
      started
    })
    .map(|t| t.timestamp())
    .max()
    .unwrap_or(0)
}

/// Put `new_activities` (newest first) in front of `cached`.
///
/// An id present in both keeps only the fresh copy, at its position among the
/// new activities. Within the new batch the first copy of an id wins.
pub fn merge(new_activities: Vec<Activity>, cached: &[Activity]) -> Vec<Activity> {
  let mut seen = HashSet::with_capacity(new_activities.len());
  let mut merged = Vec::with_capacity(new_activities.len() + cached.len());

  for activity in new_activities {
    if seen.insert(activity.id) {
      merged.push(activity);
    }
  }

  let before = merged.len();
  merged.extend(cached.iter().filter(|a| !seen.contains(&a.id)).cloned());
  let replaced = cached.len() - (merged.len() - before);
  if replaced > 0 {
    debug!(replaced, "Replaced cached activities with fresh copies");
  }

  merged
}
