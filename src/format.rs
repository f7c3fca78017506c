//! Plain-text output for the CLI.

use serde_json::Value;

use crate::strava::types::{Activity, Gear};
use crate::sync::telemetry::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
  /// Only the id, for piping into `update`
  Quiet,
  /// id, local start, name, distance
  Default,
}

impl Formatter {
  pub fn new(quiet: bool) -> Self {
    if quiet {
      Formatter::Quiet
    } else {
      Formatter::Default
    }
  }

  pub fn activity(&self, activity: &Activity) -> String {
    match self {
      Formatter::Quiet => activity.id.to_string(),
      Formatter::Default => format!(
        "{}\t{}\t{}\t{}",
        activity.id,
        activity.start_date_local,
        activity.name(),
        activity.field("distance").map(plain).unwrap_or_default()
      ),
    }
  }
}

pub fn gear(gear: &Gear) -> String {
  format!(
    "{:<20} {:<20} {:>10.1} km{}",
    gear.id,
    gear.name,
    gear.distance / 1000.0,
    if gear.primary { " *" } else { "" }
  )
}

/// Tab separated: time, offset, lat, lng, then every other field, empty when
/// missing.
pub fn sample(sample: &TelemetrySample) -> String {
  let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
  let (lat, lng) = match sample.latlng {
    Some([lat, lng]) => (lat.to_string(), lng.to_string()),
    None => (String::new(), String::new()),
  };

  [
    sample.time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    sample.offset.to_string(),
    lat,
    lng,
    number(sample.altitude),
    number(sample.distance),
    number(sample.heartrate),
    number(sample.cadence),
    number(sample.temperature),
    number(sample.watts),
    number(sample.velocity),
  ]
  .join("\t")
}

pub const SAMPLE_HEADER: &str =
  "time\toffset\tlat\tlng\taltitude\tdistance\theartrate\tcadence\ttemp\twatts\tvelocity";

/// Strings without quotes, everything else as JSON.
fn plain(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}
