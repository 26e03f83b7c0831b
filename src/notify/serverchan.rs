//! ServerChan notification channel

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult};

const SEND_URL: &str = "https://sctapi.ftqq.com";

/// ServerChan (Server酱) push channel, form-encoded `title`/`desp`.
pub struct ServerChanChannel {
    client: Client,
    send_key: String,
}

impl ServerChanChannel {
    pub fn new(send_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static config"),
            send_key: send_key.into(),
        }
    }
}

#[async_trait]
impl Channel for ServerChanChannel {
    fn name(&self) -> &str {
        "serverchan"
    }

    async fn send(&self, title: &str, content: &str) -> ChannelResult<()> {
        let url = format!("{SEND_URL}/{}.send", self.send_key);
        let response = self
            .client
            .post(&url)
            .form(&[("title", title), ("desp", content)])
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
