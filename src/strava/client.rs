use color_eyre::{eyre::eyre, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;

use super::source::RemoteSource;
use super::types::{Activity, ActivityDetail, ActivityUpdate, Athlete, StreamSet, StreamType};

/// Strava API client wrapper
#[derive(Clone)]
pub struct StravaClient {
  http: reqwest::Client,
  base_url: String,
  token: String,
  /// Pause after every request, for staying under the API rate limit
  delay: Option<Duration>,
}

impl StravaClient {
  pub fn new(config: &Config, token: String) -> Result<Self> {
    let base_url = config.api_url()?;
    let http = reqwest::Client::builder()
      .user_agent(concat!("strava-cli/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: base_url.as_str().trim_end_matches('/').to_string(),
      token: token.trim().to_string(),
      delay: config.request_delay(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// Send a request and decode the JSON body.
  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
    let response = self.send(request).await?;
    response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse Strava response: {}", e))
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response> {
    let request = request
      .bearer_auth(&self.token)
      .build()
      .map_err(|e| eyre!("Failed to build request: {}", e))?;
    debug!(method = %request.method(), url = %request.url(), "http request");

    let result = self.http.execute(request).await;
    self.throttle().await;

    let response = result.map_err(|e| eyre!("Strava request failed: {}", e))?;
    check_status(response).await
  }

  async fn throttle(&self) {
    if let Some(delay) = self.delay.filter(|d| !d.is_zero()) {
      info!(delay_ms = delay.as_millis() as u64, "Sleeping between requests");
      tokio::time::sleep(delay).await;
    }
  }

  async fn activities_page(&self, query: &[(&str, String)]) -> Result<Vec<Activity>> {
    let request = self
      .http
      .get(self.url("/athlete/activities"))
      .query(query);
    self.send_json(request).await
  }
}

/// Turn non-2xx responses into errors.
async fn check_status(response: Response) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  match status {
    StatusCode::TOO_MANY_REQUESTS => {
      warn!("Strava rate limit hit (429)");
      Err(eyre!("Strava rate limit exceeded, try again later"))
    }
    StatusCode::UNAUTHORIZED => Err(eyre!(
      "Strava rejected the access token (401), it may be expired: {}",
      body
    )),
    _ => Err(eyre!("Strava API error: HTTP {}: {}", status, body)),
  }
}

impl RemoteSource for StravaClient {
  async fn list_page(&self, page: u32, per_page: u32) -> Result<Vec<Activity>> {
    self
      .activities_page(&[
        ("page", page.to_string()),
        ("per_page", per_page.to_string()),
      ])
      .await
  }

  async fn list_after(&self, after: i64, page: u32, per_page: u32) -> Result<Vec<Activity>> {
    self
      .activities_page(&[
        ("after", after.to_string()),
        ("page", page.to_string()),
        ("per_page", per_page.to_string()),
      ])
      .await
  }

  async fn get_detail(&self, id: i64) -> Result<ActivityDetail> {
    let request = self.http.get(self.url(&format!("/activities/{}", id)));
    self
      .send_json(request)
      .await
      .map_err(|e| eyre!("Failed to get activity {}: {}", id, e))
  }

  async fn get_streams(&self, id: i64, types: &[StreamType]) -> Result<StreamSet> {
    let keys = types
      .iter()
      .map(StreamType::as_str)
      .collect::<Vec<_>>()
      .join(",");
    let request = self
      .http
      .get(self.url(&format!("/activities/{}/streams", id)))
      .query(&[("keys", keys.as_str()), ("key_by_type", "true")]);
    self
      .send_json(request)
      .await
      .map_err(|e| eyre!("Failed to get streams for activity {}: {}", id, e))
  }

  async fn update(&self, id: i64, update: &ActivityUpdate) -> Result<()> {
    let request = self
      .http
      .put(self.url(&format!("/activities/{}", id)))
      .json(update);
    self
      .send(request)
      .await
      .map_err(|e| eyre!("Failed to update activity {}: {}", id, e))?;
    Ok(())
  }

  async fn get_athlete(&self) -> Result<Athlete> {
    let request = self.http.get(self.url("/athlete"));
    self
      .send_json(request)
      .await
      .map_err(|e| eyre!("Failed to get athlete: {}", e))
  }
}
