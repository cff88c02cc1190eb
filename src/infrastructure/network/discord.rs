// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::constants::DISCORD_MESSAGE_LIMIT;
use crate::common::error::AppError;
use crate::services::report::Payload;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::time::Duration;

const DISCORD_API: &str = "https://discord.com/api/v10";

/// The two tracked messages a run publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportGroup {
    Harvests,
    Pools,
}

impl fmt::Display for ReportGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportGroup::Harvests => f.write_str("harvests"),
            ReportGroup::Pools => f.write_str("pools"),
        }
    }
}

pub trait ReportSink: Send + Sync {
    fn publish(
        &self,
        group: ReportGroup,
        payload: &Payload,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Fits `payload` into one Discord message, dropping trailing tables if needed.
fn fit_message(group: ReportGroup, payload: &Payload) -> String {
    let (text, dropped) = payload.render_within(DISCORD_MESSAGE_LIMIT);
    if dropped > 0 {
        tracing::warn!(
            target: "discord",
            group = %group,
            dropped,
            limit = DISCORD_MESSAGE_LIMIT,
            "Payload exceeds message limit; trailing tables cut"
        );
    }
    text
}

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    id: String,
}

/// Posts each report group once, pins it, and edits it in place afterwards.
pub struct DiscordChannel {
    client: Client,
    token: String,
    channel_id: String,
    messages: DashMap<ReportGroup, String>,
}

impl DiscordChannel {
    pub fn new(token: String, channel_id: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Discord HTTP client: {e}")))?;
        Ok(Self {
            client,
            token,
            channel_id,
            messages: DashMap::new(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", DISCORD_API, self.channel_id)
    }

    fn message_url(&self, message_id: &str) -> String {
        format!("{}/{message_id}", self.messages_url())
    }

    fn pin_url(&self, message_id: &str) -> String {
        format!("{}/channels/{}/pins/{message_id}", DISCORD_API, self.channel_id)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn post_message(&self, content: &str) -> Result<String, AppError> {
        let resp = self
            .client
            .post(self.messages_url())
            .header("Authorization", self.auth())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Discord createMessage failed: {e}")))?;
        let resp = check_status(resp).await?;
        let message: DiscordMessage = resp
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("Discord message decode failed: {e}")))?;
        Ok(message.id)
    }

    /// Returns `false` when the tracked message no longer exists.
    async fn edit_message(&self, message_id: &str, content: &str) -> Result<bool, AppError> {
        let resp = self
            .client
            .patch(self.message_url(message_id))
            .header("Authorization", self.auth())
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Discord editMessage failed: {e}")))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(resp).await?;
        Ok(true)
    }

    async fn pin_message(&self, message_id: &str) -> Result<(), AppError> {
        let resp = self
            .client
            .put(self.pin_url(message_id))
            .header("Authorization", self.auth())
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("Discord pinMessage failed: {e}")))?;
        check_status(resp).await.map(|_| ())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(AppError::Discord {
        status: status.as_u16(),
        message: body,
    })
}

impl ReportSink for DiscordChannel {
    async fn publish(&self, group: ReportGroup, payload: &Payload) -> Result<(), AppError> {
        let content = fit_message(group, payload);

        let tracked = self.messages.get(&group).map(|id| id.value().clone());
        if let Some(message_id) = tracked {
            if self.edit_message(&message_id, &content).await? {
                tracing::debug!(target: "discord", group = %group, message_id = %message_id, "Edited report message");
                return Ok(());
            }
            tracing::warn!(target: "discord", group = %group, message_id = %message_id, "Tracked message is gone; posting a new one");
            self.messages.remove(&group);
        }

        let message_id = self.post_message(&content).await?;
        if let Err(e) = self.pin_message(&message_id).await {
            tracing::warn!(target: "discord", group = %group, message_id = %message_id, error = %e, "Failed to pin report message");
        }
        tracing::info!(target: "discord", group = %group, message_id = %message_id, "Posted report message");
        self.messages.insert(group, message_id);
        Ok(())
    }
}

/// Dry-run sink: writes the message that would have been published to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ReportSink for LogSink {
    async fn publish(&self, group: ReportGroup, payload: &Payload) -> Result<(), AppError> {
        let content = fit_message(group, payload);
        tracing::info!(target: "discord", group = %group, "Dry run payload\n{content}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> DiscordChannel {
        DiscordChannel::new("TOKEN".into(), "890654519938134057".into(), Duration::from_secs(1))
            .unwrap()
    }

    #[test]
    fn rest_urls_target_v10_channel() {
        let c = channel();
        assert_eq!(
            c.messages_url(),
            "https://discord.com/api/v10/channels/890654519938134057/messages"
        );
        assert_eq!(
            c.message_url("42"),
            "https://discord.com/api/v10/channels/890654519938134057/messages/42"
        );
        assert_eq!(
            c.pin_url("42"),
            "https://discord.com/api/v10/channels/890654519938134057/pins/42"
        );
        assert_eq!(c.auth(), "Bot TOKEN");
    }

    #[test]
    fn oversized_payload_is_cut_to_limit() {
        let table = format!("```\n{}\n```", "x".repeat(900));
        let payload = Payload {
            tables: vec![table.clone(), table.clone(), table],
            footer: "**_Last Update:_** _now_".into(),
        };
        let content = fit_message(ReportGroup::Harvests, &payload);
        assert!(content.chars().count() <= DISCORD_MESSAGE_LIMIT);
        assert!(content.ends_with("_now_\n"));
    }

    #[tokio::test]
    async fn log_sink_accepts_any_payload() {
        let payload = Payload {
            tables: vec!["```\nempty\n```".into()],
            footer: "footer".into(),
        };
        assert!(LogSink.publish(ReportGroup::Pools, &payload).await.is_ok());
    }
}
