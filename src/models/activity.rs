use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Activity types counted as running (exact, case-sensitive match)
pub const RUNNING_TYPES: [&str; 3] = ["Run", "VirtualRun", "TrailRun"];

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ActivityError {
  #[error("Invalid activity at index {index} ({}): {reason}", describe_id(.id))]
  Invalid {
    index: usize,
    id: Option<i64>,
    reason: String,
  },

  #[error("Activity feed is not a JSON array: {0}")]
  Feed(#[from] serde_json::Error),
}

fn describe_id(id: &Option<i64>) -> String {
  match id {
    Some(id) => format!("id {}", id),
    None => "no id".to_string(),
  }
}

/// ---------------------------------------------------------------------------
/// Activity Record
/// ---------------------------------------------------------------------------

/// One recorded exercise session as delivered by the activity feed.
///
/// `type`, `distance`, `moving_time`, `start_date` and `name` are required.
/// A missing `total_elevation_gain` counts as 0 m; missing heart-rate fields
/// mean the session was recorded without a monitor. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  #[serde(default)]
  pub id: Option<i64>,
  pub name: String,
  #[serde(rename = "type")]
  pub activity_type: String,
  /// Meters
  pub distance: f64,
  /// Seconds
  pub moving_time: u64,
  pub start_date: DateTime<FixedOffset>,
  #[serde(default)]
  pub total_elevation_gain: Option<f64>,
  #[serde(default)]
  pub average_heartrate: Option<f64>,
  #[serde(default)]
  pub max_heartrate: Option<f64>,
}

impl Activity {
  pub fn is_running(&self) -> bool {
    RUNNING_TYPES.contains(&self.activity_type.as_str())
  }

  pub fn distance_km(&self) -> f64 {
    self.distance / 1000.0
  }

  pub fn elevation_gain(&self) -> f64 {
    self.total_elevation_gain.unwrap_or(0.0)
  }

  /// Pace in seconds per km, 0 when no distance was recorded
  pub fn pace_seconds_per_km(&self) -> f64 {
    if self.distance > 0.0 {
      self.moving_time as f64 / self.distance_km()
    } else {
      0.0
    }
  }

  /// Calendar date in the offset the timestamp was recorded with
  pub fn start_day(&self) -> NaiveDate {
    self.start_date.date_naive()
  }

  /// Range checks serde cannot express
  pub fn validate(&self) -> Result<(), String> {
    if !self.distance.is_finite() || self.distance < 0.0 {
      return Err(format!("distance must be a non-negative number, got {}", self.distance));
    }

    if let Some(gain) = self.total_elevation_gain {
      if !gain.is_finite() {
        return Err(format!("total_elevation_gain must be finite, got {}", gain));
      }
    }

    for (field, value) in [
      ("average_heartrate", self.average_heartrate),
      ("max_heartrate", self.max_heartrate),
    ] {
      if let Some(hr) = value {
        if !hr.is_finite() || hr < 0.0 {
          return Err(format!("{} must be a non-negative number, got {}", field, hr));
        }
      }
    }

    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Ingestion
/// ---------------------------------------------------------------------------

/// Parse a JSON array of activity records, failing on the first malformed one
pub fn parse_activities(json: &str) -> Result<Vec<Activity>, ActivityError> {
  let raw: Vec<Value> = serde_json::from_str(json)?;
  activities_from_values(raw)
}

/// Validate already-decoded JSON values into activity records.
/// Errors carry the position (and id, when present) of the offending record.
pub fn activities_from_values(raw: Vec<Value>) -> Result<Vec<Activity>, ActivityError> {
  raw
    .into_iter()
    .enumerate()
    .map(|(index, value)| {
      let id = value.get("id").and_then(Value::as_i64);

      let activity: Activity = serde_json::from_value(value).map_err(|e| ActivityError::Invalid {
        index,
        id,
        reason: e.to_string(),
      })?;

      activity
        .validate()
        .map_err(|reason| ActivityError::Invalid { index, id, reason })?;

      Ok(activity)
    })
    .collect()
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
