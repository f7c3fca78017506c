//! Write-through cache for per-activity details.

use color_eyre::Result;
use tracing::debug;

use crate::cache::{CacheStorage, CacheStore};
use crate::strava::source::RemoteSource;
use crate::strava::types::ActivityDetail;

/// Get the detail record for `id`, fetching and caching it on first use.
///
/// Cached details are never refreshed; `clear-cache` is the only way to drop
/// them.
pub async fn get_detail<R, S>(
  remote: &R,
  cache: &mut CacheStore<S>,
  id: i64,
) -> Result<ActivityDetail>
where
  R: RemoteSource,
  S: CacheStorage,
{
  if let Some(detail) = cache.get_detail(id) {
    debug!(id, "Detail cache hit");
    return Ok(detail.clone());
  }

  debug!(id, "Detail cache miss");
  let detail = remote.get_detail(id).await?;
  cache.insert_detail(detail.clone())?;
  Ok(detail)
}
