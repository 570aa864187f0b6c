//! Outbound collaborators: room messages and moderation actions.
//!
//! Both are traits so the resolution path can be exercised without a
//! platform. [`PlatformClient`] talks to the platform bridge over HTTP;
//! [`LogOnlyPlatform`] stands in when no bridge is configured.

use crate::config::PlatformConfig;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the platform. Logged by callers, never retried.
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("platform request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("platform returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("cannot build platform url: {0}")]
    InvalidUrl(String),
}

/// Posts text into the chat channel attached to a voice room.
#[async_trait]
pub trait MessagingSink: Send + Sync {
    async fn post(&self, room_id: &str, text: &str) -> Result<(), OutboundError>;
}

/// Applies a timeout to a participant.
#[async_trait]
pub trait ModerationAction: Send + Sync {
    async fn timeout(
        &self,
        room_scope: &str,
        target_id: &str,
        duration: Duration,
    ) -> Result<(), OutboundError>;
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeoutBody<'a> {
    participant_id: &'a str,
    duration_seconds: u64,
    until: String,
}

/// HTTP client for the platform bridge.
///
/// - `POST {base_url}/rooms/{room}/messages` with `{"content": ...}`
/// - `POST {base_url}/rooms/{room}/timeouts` with
///   `{"participantId", "durationSeconds", "until"}`
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PlatformClient {
    pub fn new(config: &PlatformConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("Tribunal/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    /// `{base_url}/rooms/{room_id}/{action}` with `room_id` encoded as a
    /// single path segment.
    fn endpoint(&self, room_id: &str, action: &str) -> Result<Url, OutboundError> {
        if matches!(room_id, "" | "." | "..") {
            return Err(OutboundError::InvalidUrl(format!("bad room id {:?}", room_id)));
        }
        let mut url =
            Url::parse(&self.base_url).map_err(|e| OutboundError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| OutboundError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["rooms", room_id, action]);
        Ok(url)
    }

    async fn send<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<(), OutboundError> {
        let mut request = self.client.post(url.clone()).json(body);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(OutboundError::Status(response.status()));
        }
        tracing::debug!(url = %url, "platform request succeeded");
        Ok(())
    }
}

#[async_trait]
impl MessagingSink for PlatformClient {
    async fn post(&self, room_id: &str, text: &str) -> Result<(), OutboundError> {
        let url = self.endpoint(room_id, "messages")?;
        self.send(url, &MessageBody { content: text }).await
    }
}

#[async_trait]
impl ModerationAction for PlatformClient {
    async fn timeout(
        &self,
        room_scope: &str,
        target_id: &str,
        duration: Duration,
    ) -> Result<(), OutboundError> {
        let until = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or_else(Utc::now)
            .to_rfc3339();
        let url = self.endpoint(room_scope, "timeouts")?;
        self.send(
            url,
            &TimeoutBody {
                participant_id: target_id,
                duration_seconds: duration.as_secs(),
                until,
            },
        )
        .await
    }
}

/// Logs instead of calling out. Used when `platform.base_url` is unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyPlatform;

#[async_trait]
impl MessagingSink for LogOnlyPlatform {
    async fn post(&self, room_id: &str, text: &str) -> Result<(), OutboundError> {
        tracing::info!(room_id = %room_id, text = %text, "room message (no platform configured)");
        Ok(())
    }
}

#[async_trait]
impl ModerationAction for LogOnlyPlatform {
    async fn timeout(
        &self,
        room_scope: &str,
        target_id: &str,
        duration: Duration,
    ) -> Result<(), OutboundError> {
        tracing::info!(
            room_id = %room_scope,
            target_id = %target_id,
            duration_secs = duration.as_secs(),
            "timeout requested (no platform configured)"
        );
        Ok(())
    }
}
