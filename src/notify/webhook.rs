//! Generic webhook notification channel

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult};

/// Plain JSON webhook: `{title, content, timestamp, source}` via POST.
pub struct WebhookChannel {
    client: Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static config"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, title: &str, content: &str) -> ChannelResult<()> {
        let payload = json!({
            "title": title,
            "content": content,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "source": "qiandao",
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected(format!(
                "HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
