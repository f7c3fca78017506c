use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::fields::{self, FieldKind};

/// Activity summary as returned by the list endpoints.
///
/// Only the fields the cache depends on are typed; everything else Strava sends
/// is carried through untouched in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub id: i64,
  /// Canonical UTC start time (ISO 8601)
  pub start_date: String,
  /// Start time in the athlete's local timezone (ISO 8601, "Z" suffixed)
  #[serde(default)]
  pub start_date_local: String,
  #[serde(flatten)]
  pub fields: Map<String, Value>,
}

impl Activity {
  /// Parsed `start_date`, None if the remote sent something unparseable.
  pub fn started_at(&self) -> Option<DateTime<Utc>> {
    parse_timestamp(&self.start_date)
  }

  pub fn name(&self) -> &str {
    self.fields.get("name").and_then(Value::as_str).unwrap_or("")
  }

  pub fn field(&self, key: &str) -> Option<&Value> {
    self.fields.get(key)
  }

  /// Overwrite the given fields, leaving every other field as it was.
  pub fn apply(&mut self, changes: &Map<String, Value>) {
    for (key, value) in changes {
      self.fields.insert(key.clone(), value.clone());
    }
  }
}

/// Full activity record from `GET /activities/{id}`.
///
/// A superset of [`Activity`]; kept as its own type because details live in
/// a separate part of the cache and are fetched one id at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetail {
  pub id: i64,
  pub start_date: String,
  #[serde(default)]
  pub start_date_local: String,
  #[serde(flatten)]
  pub fields: Map<String, Value>,
}

impl ActivityDetail {
  pub fn apply(&mut self, changes: &Map<String, Value>) {
    for (key, value) in changes {
      self.fields.insert(key.clone(), value.clone());
    }
  }

  /// View this detail as a summary record.
  pub fn to_activity(&self) -> Activity {
    Activity {
      id: self.id,
      start_date: self.start_date.clone(),
      start_date_local: self.start_date_local.clone(),
      fields: self.fields.clone(),
    }
  }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

/// Partial update for an activity (`PUT /activities/{id}`).
///
/// Only the keys listed in [`fields::UPDATE_FIELDS`] can be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sport_type: Option<String>,
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub activity_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub trainer: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commute: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hide_from_home: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gear_id: Option<String>,
}

impl ActivityUpdate {
  /// Build an update from `key=value` assignments.
  pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
    let mut update = Self::default();
    for assignment in assignments {
      let assignment = assignment.as_ref();
      let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| eyre!("Invalid assignment '{}', expected key=value", assignment))?;
      update.set(key.trim(), value)?;
    }
    Ok(update)
  }

  /// Set a single field by its name or alias.
  pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
    let field = fields::lookup(key).ok_or_else(|| match fields::get_suggestions(key).first() {
      Some(suggestion) => eyre!(
        "Unknown activity field '{}' (did you mean '{}'?)",
        key,
        suggestion.name
      ),
      None => eyre!(
        "Unknown activity field '{}', expected one of:\n{}",
        key,
        fields::UPDATE_FIELDS
          .iter()
          .map(|f| format!("  {:<16}{}", f.name, f.description))
          .collect::<Vec<_>>()
          .join("\n")
      ),
    })?;

    let text = || Some(value.to_string());
    let flag = || parse_bool(value).map(Some);

    match (field.name, field.kind) {
      ("name", FieldKind::Text) => self.name = text(),
      ("sport_type", FieldKind::Text) => self.sport_type = text(),
      ("type", FieldKind::Text) => self.activity_type = text(),
      ("description", FieldKind::Text) => self.description = text(),
      ("gear_id", FieldKind::Text) => self.gear_id = text(),
      ("trainer", FieldKind::Flag) => self.trainer = flag()?,
      ("commute", FieldKind::Flag) => self.commute = flag()?,
      ("hide_from_home", FieldKind::Flag) => self.hide_from_home = flag()?,
      (name, _) => return Err(eyre!("Field '{}' cannot be updated", name)),
    }
    Ok(())
  }

  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  /// The fields present in this update, keyed by their Strava names.
  pub fn to_fields(&self) -> Result<Map<String, Value>> {
    match serde_json::to_value(self).map_err(|e| eyre!("Failed to serialize update: {}", e))? {
      Value::Object(map) => Ok(map),
      other => Err(eyre!("Unexpected update encoding: {}", other)),
    }
  }
}

/// Parse the boolean spellings accepted on the command line.
pub fn parse_bool(value: &str) -> Result<bool> {
  match value.trim().to_lowercase().as_str() {
    "true" | "1" => Ok(true),
    "false" | "0" => Ok(false),
    _ => Err(eyre!("Invalid boolean value {}", value)),
  }
}

/// Telemetry stream types understood by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
  Time,
  Latlng,
  Altitude,
  Distance,
  Heartrate,
  Cadence,
  Temp,
  Watts,
  VelocitySmooth,
}

impl StreamType {
  pub const ALL: &'static [StreamType] = &[
    StreamType::Time,
    StreamType::Latlng,
    StreamType::Altitude,
    StreamType::Distance,
    StreamType::Heartrate,
    StreamType::Cadence,
    StreamType::Temp,
    StreamType::Watts,
    StreamType::VelocitySmooth,
  ];

  /// Key used by the streams endpoint.
  pub fn as_str(&self) -> &'static str {
    match self {
      StreamType::Time => "time",
      StreamType::Latlng => "latlng",
      StreamType::Altitude => "altitude",
      StreamType::Distance => "distance",
      StreamType::Heartrate => "heartrate",
      StreamType::Cadence => "cadence",
      StreamType::Temp => "temp",
      StreamType::Watts => "watts",
      StreamType::VelocitySmooth => "velocity_smooth",
    }
  }
}

impl fmt::Display for StreamType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StreamType {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    let key = s.trim().to_lowercase();
    StreamType::ALL
      .iter()
      .copied()
      .find(|t| t.as_str() == key)
      .ok_or_else(|| eyre!("Unknown stream type '{}'", s))
  }
}

/// One stream as returned with `key_by_type=true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stream {
  #[serde(default)]
  pub data: Vec<Value>,
  pub series_type: Option<String>,
  pub original_size: Option<u64>,
  pub resolution: Option<String>,
}

/// Streams of one activity keyed by stream type name.
pub type StreamSet = std::collections::BTreeMap<String, Stream>;

/// Authenticated athlete profile, reduced to what the CLI shows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Athlete {
  pub id: i64,
  #[serde(default)]
  pub bikes: Vec<Gear>,
  #[serde(default)]
  pub shoes: Vec<Gear>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Gear {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub primary: bool,
  /// Meters
  #[serde(default)]
  pub distance: f64,
}
