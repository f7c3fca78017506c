//! Turns relative-offset telemetry streams into absolute-timestamped samples.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::strava::types::{StreamSet, StreamType};

/// One point of an activity's telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
  pub time: DateTime<Utc>,
  /// Seconds since the activity started
  pub offset: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub latlng: Option<[f64; 2]>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub altitude: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distance: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub heartrate: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cadence: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub watts: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub velocity: Option<f64>,
}

impl TelemetrySample {
  /// None when `start + offset` is not a representable time.
  fn at(start: DateTime<Utc>, offset: i64) -> Option<Self> {
    let time = Duration::try_seconds(offset).and_then(|d| start.checked_add_signed(d))?;
    Some(Self {
      time,
      offset,
      latlng: None,
      altitude: None,
      distance: None,
      heartrate: None,
      cadence: None,
      temperature: None,
      watts: None,
      velocity: None,
    })
  }
}

/// Combines stream arrays into samples.
///
/// The `time` stream drives the output: one sample per entry. Every other
/// requested stream fills its field at the same index when it has a well
/// formed value there and is left empty otherwise.
#[derive(Debug, Clone)]
pub struct TelemetryAssembler {
  types: Vec<StreamType>,
}

impl TelemetryAssembler {
  pub fn new(types: &[StreamType]) -> Self {
    let mut types = types.to_vec();
    types.push(StreamType::Time);
    types.sort();
    types.dedup();
    Self { types }
  }

  /// Stream types to request, always including `time`.
  pub fn stream_types(&self) -> &[StreamType] {
    &self.types
  }

  pub fn assemble(&self, start: DateTime<Utc>, streams: &StreamSet) -> Vec<TelemetrySample> {
    let Some(time) = streams.get(StreamType::Time.as_str()) else {
      warn!("Activity has no time stream, no samples produced");
      return Vec::new();
    };

    let latlng = self.values(streams, StreamType::Latlng);
    let altitude = self.values(streams, StreamType::Altitude);
    let distance = self.values(streams, StreamType::Distance);
    let heartrate = self.values(streams, StreamType::Heartrate);
    let cadence = self.values(streams, StreamType::Cadence);
    let temp = self.values(streams, StreamType::Temp);
    let watts = self.values(streams, StreamType::Watts);
    let velocity = self.values(streams, StreamType::VelocitySmooth);

    let mut samples = Vec::with_capacity(time.data.len());
    let mut skipped = 0usize;

    for (i, offset) in time.data.iter().enumerate() {
      let sample = as_seconds(offset).and_then(|offset| TelemetrySample::at(start, offset));
      let Some(mut sample) = sample else {
        skipped += 1;
        continue;
      };

      sample.latlng = latlng.get(i).and_then(as_latlng);
      sample.altitude = number_at(altitude, i);
      sample.distance = number_at(distance, i);
      sample.heartrate = number_at(heartrate, i);
      sample.cadence = number_at(cadence, i);
      sample.temperature = number_at(temp, i);
      sample.watts = number_at(watts, i);
      sample.velocity = number_at(velocity, i);
      samples.push(sample);
    }

    if skipped > 0 {
      warn!(skipped, "Dropped samples without a usable time offset");
    }
    samples
  }

  /// Data of a requested stream, empty if not requested or not sent.
  fn values<'a>(&self, streams: &'a StreamSet, stream_type: StreamType) -> &'a [Value] {
    if !self.types.contains(&stream_type) {
      return &[];
    }
    streams
      .get(stream_type.as_str())
      .map(|s| s.data.as_slice())
      .unwrap_or(&[])
  }
}

fn as_seconds(value: &Value) -> Option<i64> {
  value
    .as_i64()
    .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

fn number_at(values: &[Value], i: usize) -> Option<f64> {
  values.get(i).and_then(Value::as_f64)
}

fn as_latlng(value: &Value) -> Option<[f64; 2]> {
  match value.as_array()?.as_slice() {
    [lat, lng] => Some([lat.as_f64()?, lng.as_f64()?]),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::strava::types::Stream;
  use chrono::TimeZone;
  use serde_json::json;

  fn stream(data: Value) -> Stream {
    Stream {
      data: data.as_array().cloned().unwrap_or_default(),
      ..Default::default()
    }
  }

  fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 10, 8, 0, 0).unwrap()
  }

  #[test]
  fn test_absolute_times() {
    let mut streams = StreamSet::new();
    streams.insert("time".into(), stream(json!([0, 5, 12])));
    streams.insert(
      "latlng".into(),
      stream(json!([[45.0, 7.0], [45.1, 7.1], [45.2, 7.2]])),
    );
    streams.insert("altitude".into(), stream(json!([100.0, 101.5, 103.0])));

    let assembler = TelemetryAssembler::new(&[StreamType::Latlng, StreamType::Altitude]);
    let samples = assembler.assemble(start(), &streams);

    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].time, start());
    assert_eq!(samples[2].time, start() + Duration::seconds(12));
    assert_eq!(samples[1].latlng, Some([45.1, 7.1]));
    assert_eq!(samples[2].altitude, Some(103.0));
    assert_eq!(samples[2].offset, 12);
  }

  #[test]
  fn test_short_optional_stream_is_omitted_per_sample() {
    let mut streams = StreamSet::new();
    streams.insert("time".into(), stream(json!([0, 1, 2, 3])));
    streams.insert("heartrate".into(), stream(json!([120, 121])));
    streams.insert("latlng".into(), stream(json!([[1.0, 2.0], null, [1.0], [3.0, 4.0]])));

    let assembler = TelemetryAssembler::new(&[StreamType::Heartrate, StreamType::Latlng]);
    let samples = assembler.assemble(start(), &streams);

    assert_eq!(samples.len(), 4);
    assert_eq!(samples[1].heartrate, Some(121.0));
    assert_eq!(samples[2].heartrate, None);
    assert_eq!(samples[1].latlng, None);
    assert_eq!(samples[2].latlng, None);
    assert_eq!(samples[3].latlng, Some([3.0, 4.0]));
  }

  #[test]
  fn test_unrequested_streams_are_ignored() {
    let mut streams = StreamSet::new();
    streams.insert("time".into(), stream(json!([0])));
    streams.insert("watts".into(), stream(json!([250])));

    let samples = TelemetryAssembler::new(&[]).assemble(start(), &streams);
    assert_eq!(samples[0].watts, None);
  }

  #[test]
  fn test_missing_time_stream_yields_nothing() {
    let mut streams = StreamSet::new();
    streams.insert("altitude".into(), stream(json!([1.0, 2.0])));
    let samples = TelemetryAssembler::new(&[StreamType::Altitude]).assemble(start(), &streams);
    assert!(samples.is_empty());
  }

  #[test]
  fn test_bad_time_entry_drops_sample() {
    let mut streams = StreamSet::new();
    streams.insert("time".into(), stream(json!([0, "x", 2])));
    let samples = TelemetryAssembler::new(&[]).assemble(start(), &streams);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1].offset, 2);
  }

  #[test]
  fn test_out_of_range_offset_drops_sample() {
    let mut streams = StreamSet::new();
    streams.insert("time".into(), stream(json!([0, 1e18, i64::MAX, 5])));
    let samples = TelemetryAssembler::new(&[]).assemble(start(), &streams);
    let offsets: Vec<i64> = samples.iter().map(|s| s.offset).collect();
    assert_eq!(offsets, vec![0, 5]);
  }

  #[test]
  fn test_time_is_always_requested() {
    let assembler = TelemetryAssembler::new(&[StreamType::Watts, StreamType::Time]);
    assert_eq!(
      assembler.stream_types(),
      &[StreamType::Time, StreamType::Watts]
    );
  }
}
