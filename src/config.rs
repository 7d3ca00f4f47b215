use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::coach::DEFAULT_MAX_TOKENS;
use crate::llm::DEFAULT_MODEL;

pub const DEFAULT_WEEKS_TO_ANALYZE: u32 = 4;
pub const DEFAULT_MIN_ACTIVITIES_FOR_ANALYSIS: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("Invalid value for {name}: '{value}'")]
  Invalid { name: &'static str, value: String },
}

/// Runtime settings for the binary, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct CoachConfig {
  /// History window fetched from the activity feed
  pub weeks_to_analyze: u32,
  /// Below this many runs the coach warns that advice is unreliable
  pub min_activities_for_analysis: usize,
  pub model: String,
  pub max_tokens: u32,
  /// Read activities from a JSON file instead of Strava
  pub activities_file: Option<PathBuf>,
}

impl Default for CoachConfig {
  fn default() -> Self {
    Self {
      weeks_to_analyze: DEFAULT_WEEKS_TO_ANALYZE,
      min_activities_for_analysis: DEFAULT_MIN_ACTIVITIES_FOR_ANALYSIS,
      model: DEFAULT_MODEL.to_string(),
      max_tokens: DEFAULT_MAX_TOKENS,
      activities_file: None,
    }
  }
}

impl CoachConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let defaults = Self::default();

    Ok(Self {
      weeks_to_analyze: parse_var("WEEKS_TO_ANALYZE", defaults.weeks_to_analyze)?,
      min_activities_for_analysis: parse_var(
        "MIN_ACTIVITIES_FOR_ANALYSIS",
        defaults.min_activities_for_analysis,
      )?,
      model: non_empty_var("COACH_MODEL").unwrap_or(defaults.model),
      max_tokens: parse_var("COACH_MAX_TOKENS", defaults.max_tokens)?,
      activities_file: non_empty_var("COACH_ACTIVITIES_FILE").map(PathBuf::from),
    })
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
  match non_empty_var(name) {
    None => Ok(default),
    Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
  }
}
