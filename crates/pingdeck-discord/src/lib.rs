use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Thin client over the two Discord REST operations the pipeline needs:
/// open a DM channel with a recipient, and post an embed into a channel.
///
/// Constructed once at startup from explicit configuration and shared
/// read-only for the process lifetime. No retry or backoff: a single failure
/// is terminal for that delivery attempt.
pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("discord request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("discord api returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// DM channel as returned by `POST /users/@me/channels`.
#[derive(Debug, Deserialize)]
pub struct DmChannel {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl DiscordClient {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, DEFAULT_API_BASE)
    }

    /// Point the client at a different API base. Used by tests to talk to a
    /// local stub server.
    pub fn with_api_base(bot_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: bot_token.into(),
            api_base: api_base.into(),
        }
    }

    /// Open (or reuse) the DM channel between the bot and `recipient_id`.
    /// Discord returns the existing channel if one is already open.
    pub async fn create_dm(&self, recipient_id: &str) -> Result<DmChannel, DiscordError> {
        let resp = self
            .http
            .post(format!("{}/users/@me/channels", self.api_base))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "recipient_id": recipient_id }))
            .send()
            .await?;

        let resp = check_status(resp).await?;
        let channel: DmChannel = resp.json().await?;
        debug!("DM channel {} open for recipient {}", channel.id, recipient_id);
        Ok(channel)
    }

    /// Post `embed` into `channel_id`.
    pub async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<(), DiscordError> {
        let resp = self
            .http
            .post(format!("{}/channels/{}/messages", self.api_base, channel_id))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "embeds": [embed] }))
            .send()
            .await?;

        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, DiscordError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(DiscordError::Api { status, body })
}
