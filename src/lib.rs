pub mod analysis;
pub mod coach;
pub mod config;
pub mod llm;
pub mod models;
pub mod strava;
pub mod training;

#[cfg(test)]
mod test_utils;

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

pub use analysis::TrainingAnalyzer;
pub use coach::{Conversation, RunningCoach};
pub use config::CoachConfig;
pub use models::Activity;

use coach::CoachError;
use config::ConfigError;
use llm::{ClaudeClient, LlmError};
use models::{parse_activities, ActivityError};
use strava::{StravaClient, StravaConfig, StravaError, DEFAULT_PER_PAGE};

#[derive(Error, Debug)]
pub enum AppError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Failed to read {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error(transparent)]
  Activity(#[from] ActivityError),

  #[error(transparent)]
  Strava(#[from] StravaError),

  #[error(transparent)]
  Llm(#[from] LlmError),

  #[error(transparent)]
  Coach(#[from] CoachError),
}

/// Load activities, then print the training context or, when a question is
/// given, the coach's answer to it.
pub async fn run(question: Option<String>) -> Result<(), AppError> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let config = CoachConfig::from_env()?;
  let activities = load_activities(&config).await?;
  let analyzer = TrainingAnalyzer::new(&activities);

  let runs = analyzer.running_activities().len();
  if runs < config.min_activities_for_analysis {
    warn!(
      runs,
      minimum = config.min_activities_for_analysis,
      "Few running activities, recommendations may be unreliable"
    );
  }

  let Some(question) = question else {
    println!("{}", analyzer.training_context_text());
    return Ok(());
  };

  let client = ClaudeClient::from_env()?.with_model(&config.model);
  let mut coach = RunningCoach::new(client).with_max_tokens(config.max_tokens);
  coach.set_training_context(&analyzer);

  let mut conversation = Conversation::new();
  let answer = coach.ask(&mut conversation, &question, true).await?;
  println!("{}", answer);

  Ok(())
}

async fn load_activities(config: &CoachConfig) -> Result<Vec<Activity>, AppError> {
  if let Some(path) = &config.activities_file {
    return load_activities_file(path);
  }

  let access_token = strava_access_token().await?;
  let client = StravaClient::with_api_base(access_token, strava::api_base_from_env());
  let after = Utc::now() - Duration::weeks(i64::from(config.weeks_to_analyze));

  Ok(client.fetch_activities(Some(after), DEFAULT_PER_PAGE).await?)
}

/// Offline feed. The whole file is analyzed, no date window is applied.
fn load_activities_file(path: &Path) -> Result<Vec<Activity>, AppError> {
  let json = std::fs::read_to_string(path).map_err(|source| AppError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let activities = parse_activities(&json)?;
  info!(count = activities.len(), path = %path.display(), "Loaded activities from file");
  Ok(activities)
}

/// `STRAVA_ACCESS_TOKEN` if set, otherwise a fresh token from
/// `STRAVA_REFRESH_TOKEN` and the app credentials.
async fn strava_access_token() -> Result<String, StravaError> {
  if let Some(token) = strava::access_token_from_env() {
    return Ok(token);
  }

  let refresh_token = std::env::var("STRAVA_REFRESH_TOKEN")
    .ok()
    .filter(|token| !token.trim().is_empty())
    .ok_or(StravaError::NotAuthenticated)?;

  let config = StravaConfig::from_env()?;
  let tokens = strava::refresh_tokens(&config, &refresh_token).await?;
  info!(expires_at = %tokens.expires_at, "Refreshed Strava access token");

  Ok(tokens.access_token)
}
