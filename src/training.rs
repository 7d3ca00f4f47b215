//! Pace formatting and pure training calculators
//!
//! Shared by the analysis engine (pace rendering) and by the coach tools
//! (training paces from a recent 5K, race time estimates, VDOT).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rendered in place of a pace when none could be computed
pub const NO_PACE: &str = "N/A";

const FIVE_K_KM: f64 = 5.0;
const RIEGEL_FATIGUE_FACTOR: f64 = 1.06;

/// Multipliers applied to the 5K pace (seconds per km)
const EASY_FACTOR: f64 = 1.25;
const TEMPO_FACTOR: f64 = 1.08;
const INTERVAL_FACTOR: f64 = 0.96;
const REPETITION_FACTOR: f64 = 0.90;
const LONG_RUN_FACTOR: f64 = 1.05;

#[derive(Error, Debug, PartialEq)]
pub enum TrainingError {
  #[error("Invalid input: {0}")]
  InvalidInput(String),
}

/// ---------------------------------------------------------------------------
/// Formatting
/// ---------------------------------------------------------------------------

/// Format seconds per km as `M:SS /km`. Seconds are truncated, not rounded.
/// A pace of exactly zero means "unknown" and renders as `N/A`.
pub fn format_pace(pace_seconds: f64) -> String {
  if pace_seconds == 0.0 {
    return NO_PACE.to_string();
  }

  let minutes = (pace_seconds / 60.0).floor() as u64;
  let seconds = (pace_seconds % 60.0).floor() as u64;
  format!("{}:{:02} /km", minutes, seconds)
}

/// Inverse of [`format_pace`], in whole seconds per km
pub fn parse_pace(formatted: &str) -> Option<u32> {
  let clock = formatted.trim().trim_end_matches("/km").trim();
  let (minutes, seconds) = clock.split_once(':')?;
  let minutes: u32 = minutes.parse().ok()?;
  let seconds: u32 = seconds.parse().ok()?;

  if seconds >= 60 {
    return None;
  }

  minutes.checked_mul(60)?.checked_add(seconds)
}

/// Format a duration as `1h 05m 09s`, or `5m 09s` under an hour
pub fn format_duration(total_seconds: u64) -> String {
  let hours = total_seconds / 3600;
  let minutes = (total_seconds % 3600) / 60;
  let seconds = total_seconds % 60;

  if hours > 0 {
    format!("{}h {:02}m {:02}s", hours, minutes, seconds)
  } else {
    format!("{}m {:02}s", minutes, seconds)
  }
}

/// Parse a race result written as `MM:SS` into minutes
pub fn parse_race_time(input: &str) -> Result<f64, TrainingError> {
  let invalid = || TrainingError::InvalidInput(format!("expected MM:SS, got '{}'", input));

  let (minutes, seconds) = input.trim().split_once(':').ok_or_else(invalid)?;
  let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
  let seconds: u32 = seconds.trim().parse().map_err(|_| invalid())?;

  if seconds >= 60 || (minutes == 0 && seconds == 0) {
    return Err(invalid());
  }

  Ok(minutes as f64 + seconds as f64 / 60.0)
}

/// ---------------------------------------------------------------------------
/// Training Paces
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePace {
  pub seconds_per_km: f64,
  pub display: String,
}

impl ZonePace {
  fn from_seconds(seconds_per_km: f64) -> Self {
    Self {
      seconds_per_km,
      display: format_pace(seconds_per_km),
    }
  }
}

/// Training paces derived from a recent 5K, after Daniels' Running Formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPaces {
  /// Raw 5K race pace
  pub base: ZonePace,
  pub easy: ZonePace,
  pub tempo: ZonePace,
  pub interval: ZonePace,
  pub repetition: ZonePace,
  pub long_run: ZonePace,
}

impl TrainingPaces {
  pub fn from_five_k(five_k_minutes: f64) -> Result<Self, TrainingError> {
    if !five_k_minutes.is_finite() || five_k_minutes <= 0.0 {
      return Err(TrainingError::InvalidInput(format!(
        "5K time must be a positive number of minutes, got {}",
        five_k_minutes
      )));
    }

    let base = five_k_minutes * 60.0 / FIVE_K_KM;
    let easy = base * EASY_FACTOR;

    Ok(Self {
      base: ZonePace::from_seconds(base),
      easy: ZonePace::from_seconds(easy),
      tempo: ZonePace::from_seconds(base * TEMPO_FACTOR),
      interval: ZonePace::from_seconds(base * INTERVAL_FACTOR),
      repetition: ZonePace::from_seconds(base * REPETITION_FACTOR),
      long_run: ZonePace::from_seconds(easy * LONG_RUN_FACTOR),
    })
  }
}

/// ---------------------------------------------------------------------------
/// Race Predictions
/// ---------------------------------------------------------------------------

/// Riegel: T2 = T1 * (D2 / D1)^1.06, in minutes
pub fn estimate_race_time(
  distance_km: f64,
  reference_distance_km: f64,
  reference_time_minutes: f64,
) -> Result<f64, TrainingError> {
  for (name, value) in [
    ("distance", distance_km),
    ("reference distance", reference_distance_km),
    ("reference time", reference_time_minutes),
  ] {
    if !value.is_finite() || value <= 0.0 {
      return Err(TrainingError::InvalidInput(format!(
        "{} must be positive, got {}",
        name, value
      )));
    }
  }

  let ratio = (distance_km / reference_distance_km).powf(RIEGEL_FATIGUE_FACTOR);
  Ok(reference_time_minutes * ratio)
}

/// Simplified VDOT from a race result: -4.6 + 0.182258 v + 0.000104 v^2,
/// with v in meters per minute. Rounded to one decimal.
pub fn calculate_vdot(distance_km: f64, time_minutes: f64) -> Result<f64, TrainingError> {
  if !time_minutes.is_finite() || time_minutes <= 0.0 {
    return Err(TrainingError::InvalidInput(format!(
      "time must be positive, got {}",
      time_minutes
    )));
  }
  if !distance_km.is_finite() || distance_km <= 0.0 {
    return Err(TrainingError::InvalidInput(format!(
      "distance must be positive, got {}",
      distance_km
    )));
  }

  let velocity = distance_km * 1000.0 / time_minutes;
  let vdot = -4.6 + 0.182258 * velocity + 0.000104 * velocity.powi(2);
  Ok((vdot * 10.0).round() / 10.0)
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
