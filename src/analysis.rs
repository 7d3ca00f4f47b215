//! Deterministic analysis layer for running activities
//!
//! This module turns a raw activity feed into weekly mileage, a load trend,
//! pace statistics and issue flags. Claude interprets these pre-computed
//! insights rather than doing math itself.
//!
//! Every accessor recomputes from the borrowed activity list; nothing is
//! cached beyond the running subset selected at construction.

use crate::models::Activity;
use crate::training::{format_pace, NO_PACE};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// ---------------------------------------------------------------------------
/// Thresholds
/// ---------------------------------------------------------------------------

/// Week-over-week increase above which volume grows too fast (10% rule)
const SAFE_CHANGE_PCT: f64 = 10.0;
/// Week-over-week drop below which the reduction is significant
const SIGNIFICANT_REDUCTION_PCT: f64 = -20.0;
/// Only runs longer than this count toward pace statistics
const MIN_PACE_DISTANCE_METERS: f64 = 1000.0;
/// Weeks inspected by the variability rule
const VARIABILITY_WEEKS: usize = 3;
/// Standard deviation above this share of the mean is "high variability"
const VARIABILITY_RATIO: f64 = 0.5;
/// History must span more than this many days before frequency is judged
const MIN_FREQUENCY_SPAN_DAYS: i64 = 7;
const MIN_RUNS_PER_WEEK: f64 = 2.0;
/// Weeks rendered into the training context
const CONTEXT_WEEKS: usize = 4;

/// Activities rendered into the training context
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Returned by [`TrainingAnalyzer::detect_issues`] when no rule fires
pub const NO_ISSUES: &str = "No significant issues detected";

fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

/// ---------------------------------------------------------------------------
/// Result Types
/// ---------------------------------------------------------------------------

/// Totals over every running activity in the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
  pub total_runs: usize,
  pub total_distance_km: f64,
  pub total_time_hours: f64,
  pub avg_distance_km: f64,
  pub avg_pace: String,
  pub total_elevation_gain_m: f64,
}

impl SummaryStats {
  fn empty() -> Self {
    Self {
      total_runs: 0,
      total_distance_km: 0.0,
      total_time_hours: 0.0,
      avg_distance_km: 0.0,
      avg_pace: NO_PACE.to_string(),
      total_elevation_gain_m: 0.0,
    }
  }
}

/// Running volume for one ISO week, anchored on its Monday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
  pub week_start: NaiveDate,
  pub iso_year: i32,
  pub iso_week: u32,
  pub runs: u32,
  pub distance_km: f64,
  pub time_hours: f64,
  pub elevation_m: f64,
}

/// Unrounded running totals for one week
#[derive(Debug)]
struct WeekAccumulator {
  week_start: NaiveDate,
  runs: u32,
  distance_km: f64,
  time_hours: f64,
  elevation_m: f64,
}

impl WeekAccumulator {
  fn new(week_start: NaiveDate) -> Self {
    Self {
      week_start,
      runs: 0,
      distance_km: 0.0,
      time_hours: 0.0,
      elevation_m: 0.0,
    }
  }

  fn add(&mut self, activity: &Activity) {
    self.runs += 1;
    self.distance_km += activity.distance_km();
    self.time_hours += activity.moving_time as f64 / 3600.0;
    self.elevation_m += activity.elevation_gain();
  }

  fn finish(self) -> WeekSummary {
    let iso = self.week_start.iso_week();
    WeekSummary {
      week_start: self.week_start,
      iso_year: iso.year(),
      iso_week: iso.week(),
      runs: self.runs,
      distance_km: round_to(self.distance_km, 2),
      time_hours: round_to(self.time_hours, 2),
      elevation_m: round_to(self.elevation_m, 0),
    }
  }
}

/// Monday of the week containing `date`
pub fn week_anchor(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Week-over-week load trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadTrend {
  InsufficientData,
  RapidIncrease,
  SignificantReduction,
  SafeProgression,
  DeloadWeek,
  Stable,
}

impl LoadTrend {
  /// First matching row wins: > 10, < -20, (0, 10], [-20, 0), == 0
  pub fn classify(change_percent: f64) -> Self {
    match change_percent {
      c if c > SAFE_CHANGE_PCT => LoadTrend::RapidIncrease,
      c if c < SIGNIFICANT_REDUCTION_PCT => LoadTrend::SignificantReduction,
      c if c > 0.0 => LoadTrend::SafeProgression,
      c if c < 0.0 => LoadTrend::DeloadWeek,
      _ => LoadTrend::Stable,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      LoadTrend::InsufficientData => "insufficient_data",
      LoadTrend::RapidIncrease => "rapid_increase",
      LoadTrend::SignificantReduction => "significant_reduction",
      LoadTrend::SafeProgression => "safe_progression",
      LoadTrend::DeloadWeek => "deload_week",
      LoadTrend::Stable => "stable",
    }
  }

  fn recommendation(&self, change_percent: f64) -> String {
    match self {
      LoadTrend::InsufficientData => {
        "At least 2 weeks of data are needed for load analysis".to_string()
      }
      LoadTrend::RapidIncrease => format!(
        "Volume up {:.1}% - exceeds the 10% rule. Elevated injury risk.",
        change_percent
      ),
      LoadTrend::SignificantReduction => format!(
        "Volume down {:.1}% - check whether this is planned recovery or an unplanned drop.",
        change_percent.abs()
      ),
      LoadTrend::SafeProgression => format!(
        "Healthy progression of {:.1}% - within safe limits.",
        change_percent
      ),
      LoadTrend::DeloadWeek => format!(
        "Deload week with {:.1}% less volume - good for recovery.",
        change_percent.abs()
      ),
      LoadTrend::Stable => "Stable volume - keep up the consistency.".to_string(),
    }
  }
}

impl fmt::Display for LoadTrend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Comparison of the two most recent weeks.
///
/// `is_safe_progression` follows the strict 10% rule (`|change| <= 10`) and is
/// independent of `trend`. A `significant_reduction` is a calm label but still
/// reports `is_safe_progression = false`; callers get both and decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoad {
  pub trend: LoadTrend,
  /// Rounded to one decimal
  pub load_change_percent: f64,
  pub current_week_km: Option<f64>,
  pub previous_week_km: Option<f64>,
  pub is_safe_progression: bool,
  pub recommendation: String,
}

impl TrainingLoad {
  /// Classify from week summaries ordered most recent first
  pub fn from_weeks(weeks: &[WeekSummary]) -> Self {
    match weeks {
      [current, previous, ..] => Self::from_volumes(current.distance_km, previous.distance_km),
      _ => Self {
        trend: LoadTrend::InsufficientData,
        load_change_percent: 0.0,
        current_week_km: None,
        previous_week_km: None,
        is_safe_progression: true,
        recommendation: LoadTrend::InsufficientData.recommendation(0.0),
      },
    }
  }

  pub fn from_volumes(current_km: f64, previous_km: f64) -> Self {
    // An empty previous week reads as flat, not as infinite growth
    let change = if previous_km == 0.0 {
      0.0
    } else {
      (current_km - previous_km) * 100.0 / previous_km
    };

    let trend = LoadTrend::classify(change);

    Self {
      trend,
      load_change_percent: round_to(change, 1),
      current_week_km: Some(current_km),
      previous_week_km: Some(previous_km),
      is_safe_progression: change.abs() <= SAFE_CHANGE_PCT,
      recommendation: trend.recommendation(change),
    }
  }
}

/// Pace statistics over runs longer than 1 km
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceDistribution {
  pub avg_pace: String,
  pub median_pace: String,
  pub fastest_pace: String,
  pub slowest_pace: String,
  /// Sample standard deviation in seconds per km, two decimals
  pub pace_variability: f64,
  pub sample_count: usize,
}

/// One activity as rendered into the training context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
  pub name: String,
  pub date: NaiveDate,
  pub distance_km: f64,
  pub time_minutes: f64,
  pub pace: String,
  pub elevation_m: f64,
  pub avg_heartrate: Option<f64>,
  pub max_heartrate: Option<f64>,
}

impl ActivitySummary {
  pub fn from_activity(activity: &Activity) -> Self {
    Self {
      name: activity.name.clone(),
      date: activity.start_day(),
      distance_km: round_to(activity.distance_km(), 2),
      time_minutes: round_to(activity.moving_time as f64 / 60.0, 1),
      pace: format_pace(activity.pace_seconds_per_km()),
      elevation_m: round_to(activity.elevation_gain(), 0),
      avg_heartrate: activity.average_heartrate,
      max_heartrate: activity.max_heartrate,
    }
  }

  fn heart_rate_note(&self) -> String {
    match (self.avg_heartrate, self.max_heartrate) {
      (Some(avg), Some(max)) => format!(", HR: {:.0}-{:.0} bpm", avg, max),
      (Some(avg), None) => format!(", HR: {:.0} bpm avg", avg),
      _ => String::new(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Statistics Helpers
/// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> f64 {
  values.iter().sum::<f64>() / values.len() as f64
}

/// Expects `sorted` in ascending order
fn median(sorted: &[f64]) -> f64 {
  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) / 2.0
  } else {
    sorted[mid]
  }
}

fn sum_squared_deviations(values: &[f64]) -> f64 {
  let m = mean(values);
  values.iter().map(|v| (v - m).powi(2)).sum()
}

fn sample_std_dev(values: &[f64]) -> f64 {
  if values.len() < 2 {
    return 0.0;
  }
  (sum_squared_deviations(values) / (values.len() - 1) as f64).sqrt()
}

fn population_std_dev(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  (sum_squared_deviations(values) / values.len() as f64).sqrt()
}

/// ---------------------------------------------------------------------------
/// Training Analyzer
/// ---------------------------------------------------------------------------

/// Select running activities, preserving the caller's order
pub fn filter_running(activities: &[Activity]) -> Vec<&Activity> {
  activities.iter().filter(|a| a.is_running()).collect()
}

/// Read-only analysis over a caller-owned activity feed.
///
/// The feed is expected most recent first (the Strava client delivers it that
/// way); `recent_activities` takes the head of the list as given.
pub struct TrainingAnalyzer<'a> {
  activities: &'a [Activity],
  running: Vec<&'a Activity>,
}

impl<'a> TrainingAnalyzer<'a> {
  pub fn new(activities: &'a [Activity]) -> Self {
    let analyzer = Self {
      activities,
      running: filter_running(activities),
    };
    debug!(
      total = analyzer.activity_count(),
      running = analyzer.running.len(),
      "Selected running activities"
    );

    analyzer
  }

  pub fn activity_count(&self) -> usize {
    self.activities.len()
  }

  pub fn running_activities(&self) -> &[&'a Activity] {
    &self.running
  }

  pub fn summary_stats(&self) -> SummaryStats {
    if self.running.is_empty() {
      return SummaryStats::empty();
    }

    let total_distance: f64 = self.running.iter().map(|a| a.distance).sum();
    let total_time: u64 = self.running.iter().map(|a| a.moving_time).sum();
    let total_elevation: f64 = self.running.iter().map(|a| a.elevation_gain()).sum();

    let count = self.running.len();
    let avg_pace_seconds = if total_distance > 0.0 {
      total_time as f64 / (total_distance / 1000.0)
    } else {
      0.0
    };

    SummaryStats {
      total_runs: count,
      total_distance_km: round_to(total_distance / 1000.0, 2),
      total_time_hours: round_to(total_time as f64 / 3600.0, 2),
      avg_distance_km: round_to(total_distance / count as f64 / 1000.0, 2),
      avg_pace: format_pace(avg_pace_seconds),
      total_elevation_gain_m: round_to(total_elevation, 0),
    }
  }

  /// Running volume per ISO week, most recent week first
  pub fn weekly_mileage(&self) -> Vec<WeekSummary> {
    let mut weeks: BTreeMap<(i32, u32), WeekAccumulator> = BTreeMap::new();

    for activity in &self.running {
      let week_start = week_anchor(activity.start_day());
      let iso = week_start.iso_week();

      weeks
        .entry((iso.year(), iso.week()))
        .or_insert_with(|| WeekAccumulator::new(week_start))
        .add(activity);
    }

    let mut summaries: Vec<WeekSummary> = weeks.into_values().map(WeekAccumulator::finish).collect();
    summaries.sort_by(|a, b| b.week_start.cmp(&a.week_start));
    summaries
  }

  pub fn training_load(&self) -> TrainingLoad {
    TrainingLoad::from_weeks(&self.weekly_mileage())
  }

  /// `None` when no run is longer than 1 km
  pub fn pace_distribution(&self) -> Option<PaceDistribution> {
    let mut paces: Vec<f64> = self
      .running
      .iter()
      .filter(|a| a.distance > MIN_PACE_DISTANCE_METERS)
      .map(|a| a.pace_seconds_per_km())
      .collect();

    if paces.is_empty() {
      return None;
    }

    paces.sort_by(f64::total_cmp);

    Some(PaceDistribution {
      avg_pace: format_pace(mean(&paces)),
      median_pace: format_pace(median(&paces)),
      fastest_pace: format_pace(paces[0]),
      slowest_pace: format_pace(paces[paces.len() - 1]),
      pace_variability: round_to(sample_std_dev(&paces), 2),
      sample_count: paces.len(),
    })
  }

  /// The first `limit` running activities in feed order
  pub fn recent_activities(&self, limit: usize) -> Vec<ActivitySummary> {
    self
      .running
      .iter()
      .take(limit)
      .map(|a| ActivitySummary::from_activity(a))
      .collect()
  }

  /// Human-readable warnings; never empty
  pub fn detect_issues(&self) -> Vec<String> {
    let mut issues = Vec::new();

    // Load progression
    let load = self.training_load();
    if !load.is_safe_progression && load.load_change_percent > SAFE_CHANGE_PCT {
      issues.push(format!(
        "Rapid volume increase ({:.1}%)",
        load.load_change_percent
      ));
    }

    // Consistency across recent weeks
    let weeks = self.weekly_mileage();
    if weeks.len() >= VARIABILITY_WEEKS {
      let distances: Vec<f64> = weeks
        .iter()
        .take(VARIABILITY_WEEKS)
        .map(|w| w.distance_km)
        .collect();

      if population_std_dev(&distances) > mean(&distances) * VARIABILITY_RATIO {
        issues.push("High variability in weekly mileage".to_string());
      }
    }

    // Frequency over the chronological extent of the feed
    let earliest = self.running.iter().map(|a| a.start_date).min();
    let latest = self.running.iter().map(|a| a.start_date).max();
    if let (Some(earliest), Some(latest)) = (earliest, latest) {
      let span_days = (latest - earliest).num_days();
      if span_days > MIN_FREQUENCY_SPAN_DAYS {
        let runs_per_week = self.running.len() as f64 / (span_days as f64 / 7.0);
        if runs_per_week < MIN_RUNS_PER_WEEK {
          issues.push(format!(
            "Low training frequency ({:.1} runs/week)",
            runs_per_week
          ));
        }
      }
    }

    debug!(count = issues.len(), "Issue rules evaluated");

    if issues.is_empty() {
      vec![NO_ISSUES.to_string()]
    } else {
      issues
    }
  }

  // Context for the LLM

  /// Render every metric into the text block handed to the coach
  pub fn training_context_text(&self) -> String {
    let summary = self.summary_stats();
    let weekly = self.weekly_mileage();
    let load = TrainingLoad::from_weeks(&weekly);
    let pace = self.pace_distribution();
    let recent = self.recent_activities(DEFAULT_RECENT_LIMIT);
    let issues = self.detect_issues();

    let mut context = format!(
      r#"
## ATHLETE DATA

### Overview (last {runs} runs)
- Total runs: {runs}
- Total distance: {distance} km
- Total time: {time} hours
- Average distance: {avg_distance} km
- Average pace: {avg_pace}
- Elevation gain: {elevation} m

### Weekly Mileage
"#,
      runs = summary.total_runs,
      distance = summary.total_distance_km,
      time = summary.total_time_hours,
      avg_distance = summary.avg_distance_km,
      avg_pace = summary.avg_pace,
      elevation = summary.total_elevation_gain_m,
    );

    for (i, week) in weekly.iter().take(CONTEXT_WEEKS).enumerate() {
      context.push_str(&format!(
        "Week {} ({}): {} km in {} runs\n",
        i + 1,
        week.week_start.format("%Y-%m-%d"),
        week.distance_km,
        week.runs
      ));
    }

    context.push_str(&format!(
      r#"
### Load Analysis
- Trend: {}
- Volume change: {}%
- {}

### Pace Distribution
"#,
      load.trend, load.load_change_percent, load.recommendation
    ));

    if let Some(pace) = pace {
      context.push_str(&format!(
        "- Average pace: {}\n- Median pace: {}\n- Fastest pace: {}\n- Slowest pace: {}\n",
        pace.avg_pace, pace.median_pace, pace.fastest_pace, pace.slowest_pace
      ));
    }

    context.push_str(&format!("\n### Last {} Activities\n", DEFAULT_RECENT_LIMIT));
    for activity in &recent {
      context.push_str(&format!(
        "- {}: {} - {} km in {} min ({}){}\n",
        activity.date.format("%Y-%m-%d"),
        activity.name,
        activity.distance_km,
        activity.time_minutes,
        activity.pace,
        activity.heart_rate_note()
      ));
    }

    context.push_str("\n### Potential Issues\n");
    for issue in &issues {
      context.push_str(&format!("- {}\n", issue));
    }

    context
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::*;

  fn week(start: &str, distance_km: f64) -> WeekSummary {
    let week_start = date(start);
    let iso = week_start.iso_week();
    WeekSummary {
      week_start,
      iso_year: iso.year(),
      iso_week: iso.week(),
      runs: 1,
      distance_km,
      time_hours: 1.0,
      elevation_m: 0.0,
    }
  }

  #[test]
  fn test_filter_keeps_running_variants_in_order() {
    let activities = vec![
      activity_of_type("Ride", "2024-03-14", 30000.0, 3600),
      activity_of_type("TrailRun", "2024-03-13", 12000.0, 4200),
      activity_of_type("Swim", "2024-03-12", 1500.0, 1800),
      activity_of_type("VirtualRun", "2024-03-11", 5000.0, 1500),
      activity_of_type("Run", "2024-03-10", 8000.0, 2400),
    ];

    let running = filter_running(&activities);
    let types: Vec<&str> = running.iter().map(|a| a.activity_type.as_str()).collect();

    assert_eq!(types, vec!["TrailRun", "VirtualRun", "Run"]);
    assert!(filter_running(&[]).is_empty());
  }

  #[test]
  fn test_summary_stats() {
    let activities = vec![
      run_with_elevation("2024-03-12", 10000.0, 3000, Some(120.0)),
      run_with_elevation("2024-03-10", 5000.0, 1500, None),
      activity_of_type("Ride", "2024-03-09", 40000.0, 5400),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let stats = analyzer.summary_stats();

    assert_eq!(stats.total_runs, 2);
    assert_eq!(stats.total_distance_km, 15.0);
    assert_eq!(stats.total_time_hours, 1.25);
    assert_eq!(stats.avg_distance_km, 7.5);
    assert_eq!(stats.avg_pace, "5:00 /km");
    assert_eq!(stats.total_elevation_gain_m, 120.0);
  }

  #[test]
  fn test_summary_stats_empty_feed() {
    let analyzer = TrainingAnalyzer::new(&[]);

    let stats = analyzer.summary_stats();

    assert_eq!(stats.total_runs, 0);
    assert_eq!(stats.total_distance_km, 0.0);
    assert_eq!(stats.avg_pace, "N/A");
  }

  #[test]
  fn test_summary_stats_zero_distance_pace_is_na() {
    let activities = vec![run_on("2024-03-12", 0.0, 1200)];
    let analyzer = TrainingAnalyzer::new(&activities);

    assert_eq!(analyzer.summary_stats().avg_pace, "N/A");
  }

  #[test]
  fn test_week_anchor_is_monday() {
    // Sunday 2024-03-17 belongs to the week of Monday 2024-03-11
    assert_eq!(week_anchor(date("2024-03-17")), date("2024-03-11"));
    assert_eq!(week_anchor(date("2024-03-11")), date("2024-03-11"));
    assert_eq!(week_anchor(date("2024-03-13")), date("2024-03-11"));
  }

  #[test]
  fn test_weekly_mileage_buckets_and_orders() {
    let activities = vec![
      run_with_elevation("2024-03-17", 12000.0, 4320, Some(50.4)), // Sun, week of 03-11
      run_with_elevation("2024-03-12", 8000.0, 2880, Some(20.3)),  // Tue, week of 03-11
      run_on("2024-03-06", 10000.0, 3600),                         // Wed, week of 03-04
      activity_of_type("Ride", "2024-03-05", 50000.0, 7200),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let weeks = analyzer.weekly_mileage();

    assert_eq!(weeks.len(), 2);
    assert_eq!(weeks[0].week_start, date("2024-03-11"));
    assert_eq!(weeks[0].runs, 2);
    assert_eq!(weeks[0].distance_km, 20.0);
    assert_eq!(weeks[0].time_hours, 2.0);
    assert_eq!(weeks[0].elevation_m, 71.0);
    assert_eq!(weeks[0].iso_week, 11);

    assert_eq!(weeks[1].week_start, date("2024-03-04"));
    assert_eq!(weeks[1].runs, 1);
    assert_eq!(weeks[1].distance_km, 10.0);
  }

  #[test]
  fn test_weekly_mileage_across_year_boundary() {
    // Mon 2024-12-30 .. Sun 2025-01-05 is ISO week 1 of 2025
    let activities = vec![
      run_on("2025-01-02", 6000.0, 1800),
      run_on("2024-12-31", 7000.0, 2100),
      run_on("2024-12-29", 5000.0, 1500), // Sunday, ISO week 52 of 2024
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let weeks = analyzer.weekly_mileage();

    assert_eq!(weeks.len(), 2);
    assert_eq!(weeks[0].week_start, date("2024-12-30"));
    assert_eq!((weeks[0].iso_year, weeks[0].iso_week), (2025, 1));
    assert_eq!(weeks[0].runs, 2);
    assert_eq!(weeks[0].distance_km, 13.0);
    assert_eq!((weeks[1].iso_year, weeks[1].iso_week), (2024, 52));
  }

  #[test]
  fn test_weekly_mileage_conserves_distance() {
    let activities = vec![
      run_on("2024-04-02", 10333.0, 3100),
      run_on("2024-03-29", 7777.0, 2300),
      run_on("2024-03-21", 12345.0, 3900),
      run_on("2024-03-20", 4321.0, 1300),
      run_on("2024-03-08", 21097.0, 6600),
      activity_of_type("Ride", "2024-03-08", 60000.0, 7200),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let bucketed: f64 = analyzer.weekly_mileage().iter().map(|w| w.distance_km).sum();
    let raw: f64 = analyzer
      .running_activities()
      .iter()
      .map(|a| a.distance / 1000.0)
      .sum();

    // Rounding happens per week at output, so allow half a cent per bucket
    assert_approx_eq!(bucketed, raw, 0.005 * 4.0 + 1e-9);
  }

  #[test]
  fn test_training_load_single_week_is_insufficient() {
    let activities = vec![
      run_on("2024-03-12", 8000.0, 2400),
      run_on("2024-03-11", 6000.0, 1800),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let load = analyzer.training_load();

    assert_eq!(load.trend, LoadTrend::InsufficientData);
    assert_eq!(load.load_change_percent, 0.0);
    assert!(load.is_safe_progression);
    assert_eq!(load.current_week_km, None);
    assert!(load.recommendation.contains("2 weeks"));
  }

  #[test]
  fn test_training_load_ten_percent_is_safe() {
    let weeks = vec![week("2024-03-11", 11.0), week("2024-03-04", 10.0)];

    let load = TrainingLoad::from_weeks(&weeks);

    assert_eq!(load.trend, LoadTrend::SafeProgression);
    assert_eq!(load.load_change_percent, 10.0);
    assert!(load.is_safe_progression);
    assert_eq!(load.current_week_km, Some(11.0));
    assert_eq!(load.previous_week_km, Some(10.0));
  }

  #[test]
  fn test_training_load_fifty_percent_is_rapid() {
    let weeks = vec![week("2024-03-11", 15.0), week("2024-03-04", 10.0)];

    let load = TrainingLoad::from_weeks(&weeks);

    assert_eq!(load.trend, LoadTrend::RapidIncrease);
    assert_eq!(load.load_change_percent, 50.0);
    assert!(!load.is_safe_progression);
    assert!(load.recommendation.contains("50.0%"));
  }

  #[test]
  fn test_training_load_from_activity_feed() {
    let activities = vec![
      run_on("2024-03-13", 15000.0, 4500),
      run_on("2024-03-06", 10000.0, 3000),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let load = analyzer.training_load();

    assert_eq!(load.trend, LoadTrend::RapidIncrease);
    assert_eq!(load.current_week_km, Some(15.0));
  }

  #[test]
  fn test_training_load_reductions() {
    let deload = TrainingLoad::from_volumes(9.5, 10.0);
    assert_eq!(deload.trend, LoadTrend::DeloadWeek);
    assert_eq!(deload.load_change_percent, -5.0);
    assert!(deload.is_safe_progression);

    // Still a deload by label, but outside the strict 10% band
    let boundary = TrainingLoad::from_volumes(8.0, 10.0);
    assert_eq!(boundary.trend, LoadTrend::DeloadWeek);
    assert!(!boundary.is_safe_progression);

    // The label reads calm, the strict 10% check still fails
    let drop = TrainingLoad::from_volumes(5.0, 10.0);
    assert_eq!(drop.trend, LoadTrend::SignificantReduction);
    assert_eq!(drop.load_change_percent, -50.0);
    assert!(!drop.is_safe_progression);
  }

  #[test]
  fn test_training_load_flat_and_empty_previous_week() {
    let flat = TrainingLoad::from_volumes(10.0, 10.0);
    assert_eq!(flat.trend, LoadTrend::Stable);
    assert!(flat.is_safe_progression);

    let from_zero = TrainingLoad::from_volumes(12.0, 0.0);
    assert_eq!(from_zero.trend, LoadTrend::Stable);
    assert_eq!(from_zero.load_change_percent, 0.0);
    assert!(from_zero.is_safe_progression);
  }

  #[test]
  fn test_load_trend_serializes_snake_case() {
    let json = serde_json::to_string(&LoadTrend::SignificantReduction).unwrap();
    assert_eq!(json, "\"significant_reduction\"");
    assert_eq!(LoadTrend::DeloadWeek.to_string(), "deload_week");
  }

  #[test]
  fn test_pace_distribution() {
    let activities = vec![
      run_on("2024-03-14", 10000.0, 3000), // 300 s/km
      run_on("2024-03-12", 5000.0, 1650),  // 330 s/km
      run_on("2024-03-10", 8000.0, 2160),  // 270 s/km
      run_on("2024-03-09", 800.0, 180),    // too short, ignored
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let pace = analyzer.pace_distribution().unwrap();

    assert_eq!(pace.sample_count, 3);
    assert_eq!(pace.avg_pace, "5:00 /km");
    assert_eq!(pace.median_pace, "5:00 /km");
    assert_eq!(pace.fastest_pace, "4:30 /km");
    assert_eq!(pace.slowest_pace, "5:30 /km");
    assert_eq!(pace.pace_variability, 30.0);
  }

  #[test]
  fn test_pace_distribution_identical_paces_has_no_variability() {
    let activities = vec![
      run_on("2024-03-14", 7000.0, 2310),
      run_on("2024-03-12", 3000.0, 990),
      run_on("2024-03-10", 12000.0, 3960),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let pace = analyzer.pace_distribution().unwrap();

    assert_eq!(pace.pace_variability, 0.0);
    assert_eq!(pace.fastest_pace, pace.slowest_pace);
  }

  #[test]
  fn test_pace_distribution_single_run_and_no_data() {
    let single = vec![run_on("2024-03-14", 5000.0, 1500)];
    let pace = TrainingAnalyzer::new(&single).pace_distribution().unwrap();
    assert_eq!(pace.pace_variability, 0.0);

    let short_only = vec![run_on("2024-03-14", 1000.0, 300)];
    assert!(TrainingAnalyzer::new(&short_only).pace_distribution().is_none());
    assert!(TrainingAnalyzer::new(&[]).pace_distribution().is_none());
  }

  #[test]
  fn test_pace_distribution_even_count_median() {
    let activities = vec![
      run_on("2024-03-14", 10000.0, 2800), // 280
      run_on("2024-03-12", 10000.0, 3000), // 300
      run_on("2024-03-10", 10000.0, 3200), // 320
      run_on("2024-03-08", 10000.0, 3600), // 360
    ];

    let pace = TrainingAnalyzer::new(&activities).pace_distribution().unwrap();

    // (300 + 320) / 2
    assert_eq!(pace.median_pace, "5:10 /km");
  }

  #[test]
  fn test_recent_activities() {
    let mut with_hr = run_with_elevation("2024-03-14", 10000.0, 3000, Some(42.6));
    with_hr.average_heartrate = Some(148.4);
    with_hr.max_heartrate = Some(171.0);

    let activities = vec![
      with_hr,
      activity_of_type("Ride", "2024-03-13", 30000.0, 3600),
      run_on("2024-03-12", 0.0, 600),
      run_on("2024-03-10", 5000.0, 1500),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let recent = analyzer.recent_activities(2);

    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].date, date("2024-03-14"));
    assert_eq!(recent[0].distance_km, 10.0);
    assert_eq!(recent[0].time_minutes, 50.0);
    assert_eq!(recent[0].pace, "5:00 /km");
    assert_eq!(recent[0].elevation_m, 43.0);
    assert_eq!(recent[0].avg_heartrate, Some(148.4));
    assert_eq!(recent[1].pace, "N/A");
    assert_eq!(analyzer.recent_activities(10).len(), 3);
  }

  #[test]
  fn test_detect_issues_empty_feed_returns_sentinel() {
    let analyzer = TrainingAnalyzer::new(&[]);

    assert_eq!(analyzer.detect_issues(), vec![NO_ISSUES.to_string()]);
  }

  #[test]
  fn test_detect_issues_rapid_increase() {
    // Four runs a week keeps the frequency rule quiet
    let mut activities = Vec::new();
    for day in ["2024-03-17", "2024-03-16", "2024-03-14", "2024-03-12"] {
      activities.push(run_on(day, 5000.0, 1500));
    }
    for day in ["2024-03-10", "2024-03-08", "2024-03-06", "2024-03-04"] {
      activities.push(run_on(day, 3000.0, 900));
    }
    let analyzer = TrainingAnalyzer::new(&activities);

    let issues = analyzer.detect_issues();

    assert_eq!(issues, vec!["Rapid volume increase (66.7%)".to_string()]);
  }

  #[test]
  fn test_detect_issues_high_variability() {
    let activities = vec![
      run_on("2024-03-20", 5000.0, 1500),
      run_on("2024-03-19", 5000.0, 1500),
      run_on("2024-03-18", 5000.0, 1500),
      run_on("2024-03-16", 9000.0, 2700),
      run_on("2024-03-14", 9000.0, 2700),
      run_on("2024-03-12", 9000.0, 2700),
      run_on("2024-03-10", 1000.0, 300),
      run_on("2024-03-08", 1000.0, 300),
      run_on("2024-03-06", 1000.0, 300),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    // Weeks: 15, 27, 3 km -> mean 15, population stdev ~9.8 > 7.5
    let issues = analyzer.detect_issues();

    assert!(issues.contains(&"High variability in weekly mileage".to_string()));
    assert!(!issues.iter().any(|i| i.starts_with("Rapid")));
  }

  #[test]
  fn test_detect_issues_low_frequency() {
    // 3 runs over 28 days -> 0.75 runs/week
    let activities = vec![
      run_on("2024-03-29", 10000.0, 3000),
      run_on("2024-03-15", 10000.0, 3000),
      run_on("2024-03-01", 10000.0, 3000),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let issues = analyzer.detect_issues();

    assert!(issues.contains(&"Low training frequency (0.8 runs/week)".to_string()));
  }

  #[test]
  fn test_detect_issues_frequency_ignores_feed_order() {
    let descending = vec![
      run_on("2024-03-29", 10000.0, 3000),
      run_on("2024-03-15", 10000.0, 3000),
      run_on("2024-03-01", 10000.0, 3000),
    ];
    let mut ascending = descending.clone();
    ascending.reverse();

    assert_eq!(
      TrainingAnalyzer::new(&descending).detect_issues(),
      TrainingAnalyzer::new(&ascending).detect_issues()
    );
  }

  #[test]
  fn test_detect_issues_short_span_is_not_judged() {
    let activities = vec![
      run_on("2024-03-15", 10000.0, 3000),
      run_on("2024-03-09", 10000.0, 3000),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    // Different weeks, same volume, 6 day span: nothing fires
    assert_eq!(analyzer.detect_issues(), vec![NO_ISSUES.to_string()]);
  }

  #[test]
  fn test_detect_issues_frequency_span_boundary() {
    // Exactly 7 days is still too short to judge
    let seven_days = vec![
      run_on("2024-03-15", 10000.0, 3000),
      run_on("2024-03-08", 10000.0, 3000),
    ];
    assert_eq!(
      TrainingAnalyzer::new(&seven_days).detect_issues(),
      vec![NO_ISSUES.to_string()]
    );

    // 8 days: 2 runs / (8 / 7) weeks = 1.75 runs/week
    let eight_days = vec![
      run_on("2024-03-15", 10000.0, 3000),
      run_on("2024-03-07", 10000.0, 3000),
    ];
    assert_eq!(
      TrainingAnalyzer::new(&eight_days).detect_issues(),
      vec!["Low training frequency (1.8 runs/week)".to_string()]
    );
  }

  #[test]
  fn test_detect_issues_change_rounding_to_ten_percent_is_quiet() {
    // 9.99 km then 10.99 km: +10.01%, reported as 10.0%
    let mut activities = Vec::new();
    for day in ["2024-03-17", "2024-03-16", "2024-03-14", "2024-03-12"] {
      activities.push(run_on(day, 2747.5, 900));
    }
    for day in ["2024-03-10", "2024-03-08", "2024-03-06", "2024-03-04"] {
      activities.push(run_on(day, 2497.5, 800));
    }
    let analyzer = TrainingAnalyzer::new(&activities);

    let load = analyzer.training_load();
    assert_approx_eq!(load.load_change_percent, 10.0, 1e-9);
    assert!(!load.is_safe_progression);

    assert_eq!(analyzer.detect_issues(), vec![NO_ISSUES.to_string()]);
  }

  #[test]
  fn test_training_context_text() {
    let mut long_run = run_on("2024-03-16", 16000.0, 5280);
    long_run.name = "Long Run".to_string();
    long_run.average_heartrate = Some(142.0);
    long_run.max_heartrate = Some(160.0);

    let activities = vec![
      long_run,
      run_on("2024-03-14", 8000.0, 2400),
      run_on("2024-03-12", 6000.0, 1800),
      run_on("2024-03-09", 14000.0, 4620),
      run_on("2024-03-06", 8000.0, 2400),
      run_on("2024-03-04", 6000.0, 1800),
    ];
    let analyzer = TrainingAnalyzer::new(&activities);

    let text = analyzer.training_context_text();

    assert!(text.contains("### Overview (last 6 runs)"));
    assert!(text.contains("- Total distance: 58 km"));
    assert!(text.contains("Week 1 (2024-03-11): 30 km in 3 runs"));
    assert!(text.contains("Week 2 (2024-03-04): 28 km in 3 runs"));
    assert!(text.contains("- Trend: safe_progression"));
    assert!(text.contains("- Volume change: 7.1%"));
    assert!(text.contains("- Fastest pace: 5:00 /km"));
    assert!(text.contains("- 2024-03-16: Long Run - 16 km in 88 min (5:30 /km), HR: 142-160 bpm"));
    assert!(text.contains("### Potential Issues\n- No significant issues detected\n"));
  }

  #[test]
  fn test_training_context_text_empty_feed() {
    let text = TrainingAnalyzer::new(&[]).training_context_text();

    assert!(text.contains("- Average pace: N/A"));
    assert!(text.contains("- Trend: insufficient_data"));
    assert!(text.contains("- No significant issues detected"));
    assert!(!text.contains("- Fastest pace"));
  }
}
