//! The remote side of the cache.

use color_eyre::Result;

use super::types::{Activity, ActivityDetail, ActivityUpdate, Athlete, StreamSet, StreamType};

/// A paginated, rate-limited source of activities.
///
/// Calls are awaited one at a time; implementations are free to throttle
/// between requests but must not retry on their own.
#[allow(async_fn_in_trait)]
pub trait RemoteSource {
  /// Page `page` (1-based) of all activities, newest first. A page shorter
  /// than `per_page` means there is nothing after it.
  async fn list_page(&self, page: u32, per_page: u32) -> Result<Vec<Activity>>;

  /// Page `page` of the activities that started strictly after `after`
  /// (epoch seconds), oldest first.
  async fn list_after(&self, after: i64, page: u32, per_page: u32) -> Result<Vec<Activity>>;

  async fn get_detail(&self, id: i64) -> Result<ActivityDetail>;

  /// Requested streams keyed by type. Types the activity does not have are
  /// simply absent.
  async fn get_streams(&self, id: i64, types: &[StreamType]) -> Result<StreamSet>;

  /// Apply `update` remotely. The local cache is only touched after this
  /// succeeds.
  async fn update(&self, id: i64, update: &ActivityUpdate) -> Result<()>;

  async fn get_athlete(&self) -> Result<Athlete>;
}
