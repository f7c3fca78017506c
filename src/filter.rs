//! `--filter key=value` predicates over cached activities.

use chrono::{NaiveDate, NaiveDateTime};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;

use crate::strava::types::{parse_bool, Activity};

/// Format of `start_date_local` as sent by Strava.
const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  /// Started (local time) before midnight of the date
  Before(NaiveDateTime),
  /// Started (local time) after midnight of the date
  After(NaiveDateTime),
  /// Boolean field equals the value
  Flag { field: &'static str, value: bool },
}

impl Predicate {
  pub fn parse(key: &str, value: &str) -> Result<Self> {
    match key.trim() {
      "before" => Ok(Predicate::Before(parse_date(value)?)),
      "after" => Ok(Predicate::After(parse_date(value)?)),
      "trainer" => Ok(Predicate::Flag {
        field: "trainer",
        value: parse_bool(value)?,
      }),
      "private" => Ok(Predicate::Flag {
        field: "private",
        value: parse_bool(value)?,
      }),
      "commute" => Ok(Predicate::Flag {
        field: "commute",
        value: parse_bool(value)?,
      }),
      other => Err(eyre!("Invalid filter type {}", other)),
    }
  }

  pub fn matches(&self, activity: &Activity) -> bool {
    match self {
      Predicate::Before(date) => local_start(activity).is_some_and(|t| t < *date),
      Predicate::After(date) => local_start(activity).is_some_and(|t| t > *date),
      Predicate::Flag { field, value } => {
        activity.field(field).and_then(Value::as_bool) == Some(*value)
      }
    }
  }
}

/// All predicates must match.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  predicates: Vec<Predicate>,
}

impl Filter {
  pub fn parse<S: AsRef<str>>(items: &[S]) -> Result<Self> {
    let predicates = items
      .iter()
      .map(|item| {
        let item = item.as_ref();
        item
          .split_once('=')
          .ok_or_else(|| eyre!("Invalid filter '{}', expected key=value", item))
          .and_then(|(key, value)| Predicate::parse(key, value))
          .map_err(|e| eyre!("Invalid value {}: {}", item, e))
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Self { predicates })
  }

  pub fn matches(&self, activity: &Activity) -> bool {
    self.predicates.iter().all(|p| p.matches(activity))
  }
}

fn local_start(activity: &Activity) -> Option<NaiveDateTime> {
  NaiveDateTime::parse_from_str(&activity.start_date_local, LOCAL_FORMAT).ok()
}

/// `YYYY`, `YYYYMM` or `YYYYMMDD`; missing parts default to the first.
fn parse_date(value: &str) -> Result<NaiveDateTime> {
  let value = value.trim();
  let full = match value.len() {
    4 => format!("{}0101", value),
    6 => format!("{}01", value),
    _ => value.to_string(),
  };
  let date = NaiveDate::parse_from_str(&full, "%Y%m%d")
    .map_err(|e| eyre!("Invalid date '{}': {}", value, e))?;
  date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| eyre!("Invalid date '{}'", value))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::activity_at;
  use chrono::{TimeZone, Utc};
  use serde_json::json;

  /// start_date_local is one hour after the given UTC time
  fn on(year: i32, month: u32, day: u32) -> Activity {
    activity_at(1, Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap())
  }

  #[test]
  fn test_date_formats() {
    assert_eq!(
      parse_date("2023").unwrap(),
      NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    );
    assert_eq!(
      parse_date("202305").unwrap().date(),
      NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()
    );
    assert_eq!(
      parse_date("20230517").unwrap().date(),
      NaiveDate::from_ymd_opt(2023, 5, 17).unwrap()
    );
    assert!(parse_date("2023-05").is_err());
  }

  #[test]
  fn test_before_after() {
    let filter = Filter::parse(&["after=202301", "before=20230201"]).unwrap();
    assert!(filter.matches(&on(2023, 1, 15)));
    assert!(!filter.matches(&on(2023, 2, 1)));
    assert!(!filter.matches(&on(2022, 12, 31)));
  }

  #[test]
  fn test_flags() {
    let mut indoor = on(2023, 1, 1);
    indoor.fields.insert("trainer".into(), json!(true));
    let outdoor = on(2023, 1, 1);

    let filter = Filter::parse(&["trainer=1"]).unwrap();
    assert!(filter.matches(&indoor));
    assert!(!filter.matches(&outdoor));

    // Missing field never matches
    let filter = Filter::parse(&["private=false"]).unwrap();
    assert!(!filter.matches(&outdoor));
  }

  #[test]
  fn test_empty_filter_matches_everything() {
    let filter = Filter::parse::<&str>(&[]).unwrap();
    assert!(filter.matches(&on(2020, 6, 1)));
  }

  #[test]
  fn test_invalid_filters() {
    assert!(Filter::parse(&["distance=10"]).is_err());
    assert!(Filter::parse(&["trainer"]).is_err());
    assert!(Filter::parse(&["before=yesterday"]).is_err());
  }
}
