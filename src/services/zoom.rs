//! Conferencing provisioner backed by Zoom's server-to-server OAuth app.
//!
//! The access token is cached until shortly before it expires. Refreshing
//! happens while the cache mutex is held, so a burst of concurrent creates
//! results in a single token request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::ZoomConfig;
use crate::error::{AppError, AppResult};

/// Tokens are refreshed this long before Zoom would reject them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MAX_TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingRequest {
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedMeeting {
    pub join_url: String,
    pub meeting_id: String,
}

#[async_trait]
pub trait ConferencingProvisioner: Send + Sync {
    async fn provision(&self, request: &MeetingRequest) -> AppResult<ProvisionedMeeting>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct CreateMeetingRequest<'a> {
    topic: &'a str,
    /// 2 = scheduled meeting
    #[serde(rename = "type")]
    meeting_type: u8,
    start_time: String,
    duration: i32,
    timezone: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreateMeetingResponse {
    id: serde_json::Value,
    join_url: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct ZoomClient {
    config: ZoomConfig,
    http_client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl ZoomClient {
    pub fn from_config(config: ZoomConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()?;
        Ok(Self {
            config,
            http_client,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting new Zoom access token");
        let url = format!("{}/oauth/token", self.config.oauth_base.trim_end_matches('/'));
        let response: TokenResponse = self
            .http_client
            .post(url)
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.config.account_id.as_str()),
            ])
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let access_token = response.access_token.clone();
        *cached = Some(CachedToken {
            access_token: response.access_token,
            expires_at: token_deadline(Instant::now(), response.expires_in),
        });
        Ok(access_token)
    }
}

/// Caps nonsense lifetimes at a day; the token is simply refreshed sooner.
fn token_deadline(now: Instant, expires_in: u64) -> Instant {
    now.checked_add(Duration::from_secs(expires_in.min(MAX_TOKEN_LIFETIME_SECS)))
        .unwrap_or(now)
}

#[async_trait]
impl ConferencingProvisioner for ZoomClient {
    async fn provision(&self, request: &MeetingRequest) -> AppResult<ProvisionedMeeting> {
        let token = self.access_token().await?;
        let body = CreateMeetingRequest {
            topic: &request.title,
            meeting_type: 2,
            start_time: request.start_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            duration: request.duration_minutes,
            timezone: "UTC",
        };

        let url = format!("{}/users/me/meetings", self.config.api_base.trim_end_matches('/'));
        let created: CreateMeetingResponse = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Zoom returns the id as a JSON number; keep it opaque.
        let meeting_id = match created.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        if created.join_url.trim().is_empty() {
            return Err(AppError::UpstreamError("Zoom returned an empty join url".to_string()));
        }

        info!(meeting_id = %meeting_id, topic = %request.title, "Zoom meeting created");
        Ok(ProvisionedMeeting {
            join_url: created.join_url,
            meeting_id,
        })
    }
}
