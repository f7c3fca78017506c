//! Cache handle that owns the in-memory snapshot and writes it through to storage.

use color_eyre::Result;
use tracing::{debug, warn};

use super::traits::{CacheSnapshot, CacheStorage};
use crate::strava::types::{Activity, ActivityDetail, ActivityUpdate};

/// Memoized view of one [`CacheStorage`].
///
/// The snapshot is read from storage on first use and kept for the lifetime
/// of the handle; later reads never touch storage again. Every mutation builds
/// the next snapshot, stores it, and only then replaces the in-memory copy, so
/// a failed write leaves both memory and storage as they were.
///
/// There is no locking: one process per cache file. Two processes running a
/// load-merge-store cycle against the same file can lose one of the updates.
pub struct CacheStore<S: CacheStorage> {
  storage: S,
  snapshot: Option<CacheSnapshot>,
  /// Storage held a readable snapshot when loaded, or we have stored one since
  initialized: bool,
}

impl<S: CacheStorage> CacheStore<S> {
  pub fn new(storage: S) -> Self {
    Self {
      storage,
      snapshot: None,
      initialized: false,
    }
  }

  #[cfg(test)]
  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Load from storage if we have not done so yet.
  fn load(&mut self) -> &mut CacheSnapshot {
    if self.snapshot.is_none() {
      let (snapshot, initialized) = if !self.storage.exists() {
        debug!("No cache found");
        (CacheSnapshot::default(), false)
      } else {
        match self.storage.load() {
          Ok(snapshot) => {
            debug!(activities = snapshot.activities.len(), "Cache loaded");
            (snapshot, true)
          }
          Err(e) => {
            warn!("Ignoring unreadable cache, it will be rebuilt: {:#}", e);
            (CacheSnapshot::default(), false)
          }
        }
      };
      self.initialized = initialized;
      self.snapshot = Some(snapshot);
    }

    self.snapshot.get_or_insert_with(CacheSnapshot::default)
  }

  /// Whether the cache has ever been populated.
  ///
  /// Distinguishes "never synced" from "synced, but there is nothing in it".
  /// An unreadable cache file counts as never synced.
  pub fn is_initialized(&mut self) -> bool {
    self.load();
    self.initialized
  }

  pub fn snapshot(&mut self) -> &CacheSnapshot {
    self.load()
  }

  /// Cached activities, newest first.
  pub fn activities(&mut self) -> &[Activity] {
    &self.snapshot().activities
  }

  /// Store `snapshot` as the new cache contents.
  pub fn persist(&mut self, snapshot: CacheSnapshot) -> Result<()> {
    self.storage.store(&snapshot)?;
    self.snapshot = Some(snapshot);
    self.initialized = true;
    Ok(())
  }

  /// Apply `change` to a copy of the current snapshot and persist the result.
  fn commit<F>(&mut self, change: F) -> Result<()>
  where
    F: FnOnce(&mut CacheSnapshot),
  {
    let mut next = self.load().clone();
    change(&mut next);
    self.persist(next)
  }

  /// Replace the activity list, keeping cached details.
  pub fn replace_activities(&mut self, activities: Vec<Activity>) -> Result<()> {
    self.commit(|snapshot| snapshot.activities = activities)
  }

  /// Find an activity by id (linear scan).
  pub fn get_activity(&mut self, id: i64) -> Option<&Activity> {
    self.load().activities.iter().find(|a| a.id == id)
  }

  /// Overwrite the fields present in `update` on the cached activity `id`.
  ///
  /// The record keeps its position. A cached detail for the same id gets the
  /// same fields, even when the id is not in the activity list. Returns
  /// whether `id` is in the activity list; nothing is written when neither
  /// the list nor the details know it.
  pub fn update_activity(&mut self, id: i64, update: &ActivityUpdate) -> Result<bool> {
    let changes = update.to_fields()?;

    let snapshot = self.load();
    let index = snapshot.activities.iter().position(|a| a.id == id);
    let has_detail = snapshot.activity_details.contains_key(&id);

    if index.is_none() && !has_detail {
      debug!(id, "Activity not cached, nothing to merge");
      return Ok(false);
    }

    self.commit(|snapshot| {
      if let Some(index) = index {
        snapshot.activities[index].apply(&changes);
      }
      if let Some(detail) = snapshot.activity_details.get_mut(&id) {
        detail.apply(&changes);
      }
    })?;
    Ok(index.is_some())
  }

  pub fn get_detail(&mut self, id: i64) -> Option<&ActivityDetail> {
    self.load().activity_details.get(&id)
  }

  /// Add a detail record and persist.
  pub fn insert_detail(&mut self, detail: ActivityDetail) -> Result<()> {
    self.commit(|snapshot| {
      snapshot.activity_details.insert(detail.id, detail);
    })
  }

  /// Remove the stored cache and reset to empty. Idempotent.
  pub fn clear(&mut self) -> Result<()> {
    self.storage.remove()?;
    self.snapshot = Some(CacheSnapshot::default());
    self.initialized = false;
    Ok(())
  }
}
