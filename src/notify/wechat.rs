//! WeChat Work robot notification channel

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{delivery_timestamp, Channel, ChannelError, ChannelResult};

#[derive(Debug, Deserialize)]
struct RobotResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// WeChat Work (企业微信) group robot, markdown message type.
pub struct WeChatWorkChannel {
    client: Client,
    webhook_url: String,
}

impl WeChatWorkChannel {
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
impl Channel for WeChatWorkChannel {
    fn name(&self) -> &str {
        "wechat-work"
    }

    async fn send(&self, title: &str, content: &str) -> ChannelResult<()> {
        let payload = json!({
            "msgtype": "markdown",
            "markdown": {
                "content": format!(
                    "## {title}\n```\n{content}\n```\n\n<font color=\"info\">发送时间: {}</font>",
                    delivery_timestamp()
                ),
            },
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

        let body: RobotResponse = response.json().await?;
        if body.errcode != 0 {
            return Err(ChannelError::Rejected(format!(
                "errcode {}: {}",
                body.errcode, body.errmsg
            )));
        }

        Ok(())
    }
}
