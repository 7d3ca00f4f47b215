//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Activity factories
//! - Strava payload fixtures
//! - Helper assertions

use crate::models::Activity;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{json, Value};

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Parse a `YYYY-MM-DD` date
pub fn date(ymd: &str) -> NaiveDate {
  NaiveDate::parse_from_str(ymd, "%Y-%m-%d").expect("Invalid test date")
}

/// 07:00 UTC on the given day
pub fn morning_of(ymd: &str) -> DateTime<FixedOffset> {
  DateTime::parse_from_rfc3339(&format!("{}T07:00:00Z", ymd)).expect("Invalid test date")
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Create an activity of any type at 07:00 UTC on `ymd`
pub fn activity_of_type(activity_type: &str, ymd: &str, distance_m: f64, moving_time: u64) -> Activity {
  Activity {
    id: None,
    name: format!("{} {}", activity_type, ymd),
    activity_type: activity_type.to_string(),
    distance: distance_m,
    moving_time,
    start_date: morning_of(ymd),
    total_elevation_gain: None,
    average_heartrate: None,
    max_heartrate: None,
  }
}

/// Create a plain run without elevation or heart rate
pub fn run_on(ymd: &str, distance_m: f64, moving_time: u64) -> Activity {
  activity_of_type("Run", ymd, distance_m, moving_time)
}

pub fn run_with_elevation(
  ymd: &str,
  distance_m: f64,
  moving_time: u64,
  elevation_m: Option<f64>,
) -> Activity {
  Activity {
    total_elevation_gain: elevation_m,
    ..run_on(ymd, distance_m, moving_time)
  }
}

/// A Strava `/athlete/activities` item as returned by the API
pub fn mock_strava_activity_json(id: i64, activity_type: &str, start_date: &str) -> Value {
  json!({
    "id": id,
    "name": "Morning Run",
    "type": activity_type,
    "sport_type": activity_type,
    "start_date": start_date,
    "start_date_local": start_date,
    "elapsed_time": 3100,
    "moving_time": 3000,
    "distance": 10000.0,
    "total_elevation_gain": 100.0,
    "average_heartrate": 145.0,
    "max_heartrate": 165.0,
    "kudos_count": 4
  })
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::activities_from_values;

  #[test]
  fn test_mock_factories_create_valid_data() {
    let run = run_with_elevation("2024-03-12", 10000.0, 3000, Some(55.0));
    assert!(run.is_running());
    assert_eq!(run.start_day(), date("2024-03-12"));
    assert_eq!(run.elevation_gain(), 55.0);
    assert!(run.validate().is_ok());

    let ride = activity_of_type("Ride", "2024-03-12", 30000.0, 3600);
    assert!(!ride.is_running());
  }

  #[test]
  fn test_strava_fixture_passes_ingestion() {
    let raw = vec![mock_strava_activity_json(9, "Run", "2024-03-12T06:00:00Z")];

    let activities = activities_from_values(raw).unwrap();

    assert_eq!(activities[0].id, Some(9));
    assert_eq!(activities[0].moving_time, 3000);
  }
}
