use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use tracing::{debug, info};
use url::Url;

use crate::models::{activities_from_values, Activity, ActivityError};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const STRAVA_OAUTH_BASE: &str = "https://www.strava.com/oauth";
const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8765/callback";
const AUTH_SCOPE: &str = "read,activity:read_all";
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

/// Upper bound on pages fetched by a single `fetch_activities` call
pub const MAX_PAGES: u32 = 10;
pub const DEFAULT_PER_PAGE: u32 = 100;

/// ---------------------------------------------------------------------------
/// OAuth Data Structures
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StravaConfig {
  pub client_id: String,
  pub client_secret: String,
  pub redirect_uri: String,
  pub oauth_base: String,
  pub api_base: String,
}

impl StravaConfig {
  pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
    Self {
      client_id: client_id.into(),
      client_secret: client_secret.into(),
      redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
      oauth_base: STRAVA_OAUTH_BASE.to_string(),
      api_base: STRAVA_API_BASE.to_string(),
    }
  }

  pub fn from_env() -> Result<Self, StravaError> {
    let mut config = Self::new(
      env::var("STRAVA_CLIENT_ID")
        .map_err(|_| StravaError::MissingConfig("STRAVA_CLIENT_ID".into()))?,
      env::var("STRAVA_CLIENT_SECRET")
        .map_err(|_| StravaError::MissingConfig("STRAVA_CLIENT_SECRET".into()))?,
    );

    if let Ok(redirect_uri) = env::var("STRAVA_REDIRECT_URI") {
      config.redirect_uri = redirect_uri;
    }
    config.api_base = api_base_from_env();

    Ok(config)
  }

  fn token_url(&self) -> String {
    format!("{}/token", self.oauth_base)
  }
}

/// Response from Strava token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: i64,
  pub athlete: Option<StravaAthlete>,
}

/// Token state handed back to the caller, who owns persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaTokens {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
}

impl StravaTokens {
  pub fn from_response(resp: TokenResponse) -> Self {
    Self {
      access_token: resp.access_token,
      refresh_token: resp.refresh_token,
      expires_at: DateTime::from_timestamp(resp.expires_at, 0).unwrap_or_else(Utc::now),
    }
  }

  pub fn needs_refresh(&self) -> bool {
    self.needs_refresh_at(Utc::now())
  }

  fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
    let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
    now + buffer >= self.expires_at
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StravaError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("OAuth error: {0}")]
  OAuth(String),

  #[error("Strava API error: {0}")]
  Api(String),

  #[error(transparent)]
  Activity(#[from] ActivityError),

  #[error("Not authenticated with Strava")]
  NotAuthenticated,
}

/// ---------------------------------------------------------------------------
/// OAuth URL Generation
/// ---------------------------------------------------------------------------

pub fn build_auth_url(config: &StravaConfig) -> Result<String, StravaError> {
  let mut url = Url::parse(&format!("{}/authorize", config.oauth_base))
    .map_err(|e| StravaError::OAuth(e.to_string()))?;

  url
    .query_pairs_mut()
    .append_pair("client_id", &config.client_id)
    .append_pair("redirect_uri", &config.redirect_uri)
    .append_pair("response_type", "code")
    .append_pair("scope", AUTH_SCOPE)
    .append_pair("approval_prompt", "auto");

  Ok(url.to_string())
}

/// ---------------------------------------------------------------------------
/// Token Exchange and Refresh
/// ---------------------------------------------------------------------------

pub async fn exchange_code_for_tokens(
  config: &StravaConfig,
  code: &str,
) -> Result<StravaTokens, StravaError> {
  request_tokens(
    config,
    &[("code", code), ("grant_type", "authorization_code")],
    "Token exchange failed",
  )
  .await
}

pub async fn refresh_tokens(
  config: &StravaConfig,
  refresh_token: &str,
) -> Result<StravaTokens, StravaError> {
  request_tokens(
    config,
    &[("refresh_token", refresh_token), ("grant_type", "refresh_token")],
    "Token refresh failed",
  )
  .await
}

async fn request_tokens(
  config: &StravaConfig,
  grant: &[(&str, &str)],
  failure: &str,
) -> Result<StravaTokens, StravaError> {
  let mut form = vec![
    ("client_id", config.client_id.as_str()),
    ("client_secret", config.client_secret.as_str()),
  ];
  form.extend_from_slice(grant);

  let response = Client::new().post(config.token_url()).form(&form).send().await?;

  if !response.status().is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(StravaError::OAuth(format!("{}: {}", failure, error_text)));
  }

  let token_response: TokenResponse = response.json().await?;
  if let Some(athlete) = &token_response.athlete {
    info!(athlete_id = athlete.id, "Strava tokens issued");
  }

  Ok(StravaTokens::from_response(token_response))
}

/// Access token supplied directly through `STRAVA_ACCESS_TOKEN`, if any
pub fn access_token_from_env() -> Option<String> {
  env::var("STRAVA_ACCESS_TOKEN")
    .ok()
    .filter(|token| !token.trim().is_empty())
}

/// `STRAVA_API_BASE`, falling back to the public v3 endpoint
pub fn api_base_from_env() -> String {
  env::var("STRAVA_API_BASE")
    .ok()
    .filter(|base| !base.trim().is_empty())
    .map(|base| base.trim_end_matches('/').to_string())
    .unwrap_or_else(|| STRAVA_API_BASE.to_string())
}

/// ---------------------------------------------------------------------------
/// Strava API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaAthlete {
  pub id: i64,
  pub firstname: Option<String>,
  pub lastname: Option<String>,
  #[serde(default)]
  pub city: Option<String>,
  #[serde(default)]
  pub country: Option<String>,
}

/// One block of `/athletes/{id}/stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTotals {
  pub count: u64,
  /// Meters
  pub distance: f64,
  /// Seconds
  pub moving_time: u64,
  #[serde(default)]
  pub elevation_gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
  /// Last four weeks
  pub recent_run_totals: RunTotals,
  pub ytd_run_totals: RunTotals,
  pub all_run_totals: RunTotals,
}

/// ---------------------------------------------------------------------------
/// Strava API Client
/// ---------------------------------------------------------------------------

pub struct StravaClient {
  client: Client,
  api_base: String,
  access_token: String,
}

impl StravaClient {
  pub fn new(access_token: impl Into<String>) -> Self {
    Self::with_api_base(access_token, STRAVA_API_BASE)
  }

  pub fn with_api_base(access_token: impl Into<String>, api_base: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_base: api_base.into().trim_end_matches('/').to_string(),
      access_token: access_token.into(),
    }
  }

  async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response, StravaError> {
    let response = self
      .client
      .get(format!("{}{}", self.api_base, path))
      .bearer_auth(&self.access_token)
      .query(query)
      .send()
      .await?;

    if response.status() == StatusCode::UNAUTHORIZED {
      return Err(StravaError::NotAuthenticated);
    }

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(StravaError::Api(format!(
        "GET {} returned {}: {}",
        path, status, error_text
      )));
    }

    Ok(response)
  }

  pub async fn fetch_athlete(&self) -> Result<StravaAthlete, StravaError> {
    let athlete = self.get("/athlete", &[]).await?.json().await?;
    Ok(athlete)
  }

  pub async fn fetch_run_totals(&self, athlete_id: i64) -> Result<RunStats, StravaError> {
    let path = format!("/athletes/{}/stats", athlete_id);
    let stats = self.get(&path, &[]).await?.json().await?;
    Ok(stats)
  }

  /// Fetch activities started after `after`, newest first.
  ///
  /// Pages are requested until Strava returns an empty page or `MAX_PAGES`
  /// is reached. Every record passes through activity validation, so a bad
  /// record fails the whole fetch with its position in the combined feed.
  pub async fn fetch_activities(
    &self,
    after: Option<DateTime<Utc>>,
    per_page: u32,
  ) -> Result<Vec<Activity>, StravaError> {
    let mut raw: Vec<Value> = Vec::new();

    for page in 1..=MAX_PAGES {
      let mut query = vec![
        ("page", page.to_string()),
        ("per_page", per_page.to_string()),
      ];
      if let Some(after) = after {
        query.push(("after", after.timestamp().to_string()));
      }

      let batch: Vec<Value> = self.get("/athlete/activities", &query).await?.json().await?;
      debug!(page, count = batch.len(), "Fetched activity page");

      if batch.is_empty() {
        break;
      }
      raw.extend(batch);
    }

    let mut activities = activities_from_values(raw)?;
    activities.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    info!(count = activities.len(), "Fetched Strava activities");
    Ok(activities)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
