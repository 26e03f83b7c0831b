//! Slack webhook notification channel

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{delivery_timestamp, Channel, ChannelError, ChannelResult};

/// Slack incoming webhook, Block Kit layout.
pub struct SlackChannel {
    client: Client,
    webhook_url: String,
}

impl SlackChannel {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static config"),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, title: &str, content: &str) -> ChannelResult<()> {
        let payload = json!({
            "text": title,
            "blocks": [
                {
                    "type": "header",
                    "text": { "type": "plain_text", "text": title },
                },
                {
                    "type": "section",
                    "text": { "type": "mrkdwn", "text": format!("```\n{content}\n```") },
                },
                {
                    "type": "context",
                    "elements": [
                        {
                            "type": "mrkdwn",
                            "text": format!("发送时间: {}", delivery_timestamp()),
                        }
                    ],
                },
            ],
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected(format!(
                "HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
