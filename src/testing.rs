//! Test fixtures: activity builders and an in-memory Strava.

use chrono::{DateTime, Duration, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::strava::source::RemoteSource;
use crate::strava::types::{
  Activity, ActivityDetail, ActivityUpdate, Athlete, Gear, StreamSet, StreamType,
};

/// 2023-01-01T00:00:00Z
pub fn epoch() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

/// Activity `id` starting `id` hours after [`epoch`], so higher ids are newer.
pub fn activity(id: i64) -> Activity {
  activity_at(id, epoch() + Duration::hours(id))
}

pub fn activity_at(id: i64, start: DateTime<Utc>) -> Activity {
  let mut fields = Map::new();
  fields.insert("name".into(), json!(format!("Activity {}", id)));
  fields.insert("distance".into(), json!(1000.0 * id as f64));
  fields.insert("trainer".into(), json!(false));
  Activity {
    id,
    start_date: start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    start_date_local: (start + Duration::hours(1))
      .format("%Y-%m-%dT%H:%M:%SZ")
      .to_string(),
    fields,
  }
}

pub fn detail(id: i64) -> ActivityDetail {
  let summary = activity(id);
  let mut fields = summary.fields;
  fields.insert("description".into(), json!("details"));
  ActivityDetail {
    id,
    start_date: summary.start_date,
    start_date_local: summary.start_date_local,
    fields,
  }
}

/// Remote calls made against [`FakeStrava`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  ListPage(u32),
  ListAfter(i64, u32),
  Detail(i64),
  Streams(i64),
  Update(i64),
  Athlete,
}

/// In-memory Strava holding one athlete's activities.
#[derive(Default)]
pub struct FakeStrava {
  /// Newest first
  activities: RefCell<Vec<Activity>>,
  streams: RefCell<BTreeMap<i64, StreamSet>>,
  calls: RefCell<Vec<Call>>,
  /// Calls left before every request fails
  fail_after: Cell<Option<usize>>,
  athlete: Athlete,
}

impl FakeStrava {
  /// `activities` in any order; they are served newest first.
  pub fn new(activities: Vec<Activity>) -> Self {
    let fake = Self::default();
    fake.set_activities(activities);
    fake
  }

  pub fn with_athlete(mut self, bikes: Vec<Gear>, shoes: Vec<Gear>) -> Self {
    self.athlete = Athlete {
      id: 1,
      bikes,
      shoes,
    };
    self
  }

  pub fn set_activities(&self, mut activities: Vec<Activity>) {
    activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    self.activities.replace(activities);
  }

  pub fn add(&self, activity: Activity) {
    let mut all = self.activities.borrow().clone();
    all.push(activity);
    self.set_activities(all);
  }

  pub fn set_streams(&self, id: i64, streams: StreamSet) {
    self.streams.borrow_mut().insert(id, streams);
  }

  /// Let `calls` more requests through, then fail everything.
  pub fn fail_after(&self, calls: usize) {
    self.fail_after.set(Some(calls));
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.borrow().clone()
  }

  pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
    self.calls.borrow().iter().filter(|c| matches(c)).count()
  }

  pub fn reset_calls(&self) {
    self.calls.borrow_mut().clear();
  }

  fn record(&self, call: Call) -> Result<()> {
    self.calls.borrow_mut().push(call);
    match self.fail_after.get() {
      Some(0) => Err(eyre!("HTTP 503: Service Unavailable")),
      Some(n) => {
        self.fail_after.set(Some(n - 1));
        Ok(())
      }
      None => Ok(()),
    }
  }
}

fn page_of<T: Clone>(items: &[T], page: u32, per_page: u32) -> Vec<T> {
  let start = (page.saturating_sub(1) * per_page) as usize;
  items
    .iter()
    .skip(start)
    .take(per_page as usize)
    .cloned()
    .collect()
}

impl RemoteSource for FakeStrava {
  async fn list_page(&self, page: u32, per_page: u32) -> Result<Vec<Activity>> {
    self.record(Call::ListPage(page))?;
    Ok(page_of(&self.activities.borrow(), page, per_page))
  }

  async fn list_after(&self, after: i64, page: u32, per_page: u32) -> Result<Vec<Activity>> {
    self.record(Call::ListAfter(after, page))?;
    let mut newer: Vec<Activity> = self
      .activities
      .borrow()
      .iter()
      .filter(|a| a.started_at().map(|t| t.timestamp() > after).unwrap_or(false))
      .cloned()
      .collect();
    newer.reverse();
    Ok(page_of(&newer, page, per_page))
  }

  async fn get_detail(&self, id: i64) -> Result<ActivityDetail> {
    self.record(Call::Detail(id))?;
    let known = self.activities.borrow().iter().any(|a| a.id == id);
    if known {
      Ok(detail(id))
    } else {
      Err(eyre!("HTTP 404: Record Not Found"))
    }
  }

  async fn get_streams(&self, id: i64, _types: &[StreamType]) -> Result<StreamSet> {
    self.record(Call::Streams(id))?;
    Ok(self.streams.borrow().get(&id).cloned().unwrap_or_default())
  }

  async fn update(&self, id: i64, update: &ActivityUpdate) -> Result<()> {
    self.record(Call::Update(id))?;
    let changes: Map<String, Value> = update.to_fields()?;
    let mut all = self.activities.borrow_mut();
    let activity = all
      .iter_mut()
      .find(|a| a.id == id)
      .ok_or_else(|| eyre!("HTTP 404: Record Not Found"))?;
    activity.apply(&changes);
    Ok(())
  }

  async fn get_athlete(&self) -> Result<Athlete> {
    self.record(Call::Athlete)?;
    Ok(self.athlete.clone())
  }
}
