//! Strava client with a transparent local activity cache.

use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info};

use crate::cache::{CacheStorage, CacheStore};
use crate::sync::detail;
use crate::sync::telemetry::{TelemetryAssembler, TelemetrySample};
use crate::sync::{SyncEngine, SyncMode, SyncReport};

use super::source::RemoteSource;
use super::types::{Activity, ActivityDetail, ActivityUpdate, Gear};

/// Strava client with transparent caching support.
///
/// Wraps a [`RemoteSource`] and answers collection reads from the cache after
/// catching it up, so listing and filtering never refetch everything.
pub struct CachedStrava<R: RemoteSource, S: CacheStorage> {
  inner: R,
  cache: CacheStore<S>,
  engine: SyncEngine,
}

impl<R: RemoteSource, S: CacheStorage> CachedStrava<R, S> {
  pub fn new(inner: R, storage: S) -> Self {
    Self {
      inner,
      cache: CacheStore::new(storage),
      engine: SyncEngine::new(),
    }
  }

  #[cfg(test)]
  pub fn remote(&self) -> &R {
    &self.inner
  }

  /// Bring the cache up to date without reading anything.
  pub async fn sync(&mut self, mode: SyncMode) -> Result<SyncReport> {
    let report = self.engine.sync(&self.inner, &mut self.cache, mode).await?;
    info!(source = ?report.source, fetched = report.fetched, "Sync finished");
    Ok(report)
  }

  /// All activities, newest first.
  pub async fn activities(&mut self, mode: SyncMode) -> Result<&[Activity]> {
    self.sync(mode).await?;
    Ok(self.cache.activities())
  }

  /// A single activity from the (synced) collection.
  pub async fn activity(&mut self, id: i64, mode: SyncMode) -> Result<Option<Activity>> {
    self.sync(mode).await?;
    Ok(self.cache.get_activity(id).cloned())
  }

  /// Detail record, fetched once and then served from the cache.
  pub async fn detail(&mut self, id: i64) -> Result<ActivityDetail> {
    detail::get_detail(&self.inner, &mut self.cache, id).await
  }

  /// Activity plus its telemetry as absolute-timestamped samples.
  ///
  /// The start time comes from the synced collection, or from the detail
  /// record when the activity is not in the list.
  pub async fn telemetry(
    &mut self,
    id: i64,
    assembler: &TelemetryAssembler,
  ) -> Result<(Activity, Vec<TelemetrySample>)> {
    let activity = match self.activity(id, SyncMode::Incremental).await? {
      Some(activity) => activity,
      None => self.detail(id).await?.to_activity(),
    };

    let start = activity
      .started_at()
      .ok_or_else(|| eyre!("Activity {} has an invalid start_date '{}'", id, activity.start_date))?;

    let streams = self
      .inner
      .get_streams(id, assembler.stream_types())
      .await?;
    let samples = assembler.assemble(start, &streams);

    Ok((activity, samples))
  }

  /// Update an activity remotely, then replay the change onto the cache.
  ///
  /// Returns whether the activity was in the cache. The cache is not touched
  /// when the remote update fails.
  pub async fn update_activity(&mut self, id: i64, update: &ActivityUpdate) -> Result<bool> {
    info!(id, ?update, "Updating activity");
    self.inner.update(id, update).await?;
    self.cache.update_activity(id, update)
  }

  /// Bikes of the authenticated athlete (not cached).
  pub async fn bikes(&self) -> Result<Vec<Gear>> {
    let athlete = self.inner.get_athlete().await?;
    debug!(athlete = athlete.id, count = athlete.bikes.len(), "Loaded bikes");
    Ok(athlete.bikes)
  }

  /// Shoes of the authenticated athlete (not cached).
  pub async fn shoes(&self) -> Result<Vec<Gear>> {
    let athlete = self.inner.get_athlete().await?;
    debug!(athlete = athlete.id, count = athlete.shoes.len(), "Loaded shoes");
    Ok(athlete.shoes)
  }

  pub fn clear_cache(&mut self) -> Result<()> {
    self.cache.clear()
  }
}
