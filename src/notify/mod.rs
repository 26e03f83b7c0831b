//! Notification fanout
//!
//! One digest, many independent channels. Every channel whose configuration
//! is present gets one delivery attempt; failures are logged and never
//! affect the other channels or the caller. There is no delivery retry and
//! no exactly-once guarantee.

pub mod dingtalk;
pub mod serverchan;
pub mod slack;
pub mod smtp;
pub mod webhook;
pub mod wechat;

use async_trait::async_trait;
use chrono_tz::Asia::Shanghai;
use futures::future::join_all;
use thiserror::Error;

pub use dingtalk::DingTalkChannel;
pub use serverchan::ServerChanChannel;
pub use slack::SlackChannel;
pub use smtp::{SmtpChannel, SmtpConfig, SmtpError};
pub use webhook::WebhookChannel;
pub use wechat::WeChatWorkChannel;

use crate::config::NotifyConfig;

/// Digest title shared by every channel
pub const DIGEST_TITLE: &str = "【森空岛每日签到】";

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur during notification delivery
#[derive(Error, Debug)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The channel endpoint rejected the delivery
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// Mail transport failure
    #[error("mail transport error: {0}")]
    MailTransport(#[from] SmtpError),
}

/// One notification channel.
///
/// Implementations map the digest's title and content into the channel's
/// payload shape and issue a single outbound request (or, for mail, one
/// SMTP session).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name used in logs
    fn name(&self) -> &str;

    /// Deliver one digest through this channel.
    async fn send(&self, title: &str, content: &str) -> ChannelResult<()>;
}

/// Delivery timestamp rendered in the game server's timezone.
pub(crate) fn delivery_timestamp() -> String {
    chrono::Utc::now()
        .with_timezone(&Shanghai)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Dispatches one digest to every configured channel.
pub struct Notifier {
    channels: Vec<Box<dyn Channel>>,
}

impl Notifier {
    /// Build the channel set from configuration; absent fields silently
    /// disable their channel.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut channels: Vec<Box<dyn Channel>> = Vec::new();

        if let Some(key) = &config.server_chan_key {
            channels.push(Box::new(ServerChanChannel::new(key)));
        }
        if let Some(smtp) = &config.smtp {
            channels.push(Box::new(SmtpChannel::new(smtp.clone())));
        }
        if let Some(url) = &config.webhook_url {
            channels.push(Box::new(WebhookChannel::new(url)));
        }
        if let Some(url) = &config.ding_talk_webhook {
            channels.push(Box::new(DingTalkChannel::new(url)));
        }
        if let Some(url) = &config.we_chat_work_webhook {
            channels.push(Box::new(WeChatWorkChannel::new(url)));
        }
        if let Some(url) = &config.slack_webhook {
            channels.push(Box::new(SlackChannel::new(url)));
        }

        Self { channels }
    }

    /// Build a notifier over an explicit channel set.
    pub fn with_channels(channels: Vec<Box<dyn Channel>>) -> Self {
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver the digest on every channel concurrently.
    ///
    /// Channels share no state, so deliveries run in parallel; each failure
    /// is caught and logged at the channel boundary. Never fails.
    pub async fn dispatch(&self, title: &str, content: &str) {
        if self.channels.is_empty() {
            return;
        }

        tracing::info!(channels = self.channels.len(), "dispatching notifications");

        let results = join_all(
            self.channels
                .iter()
                .map(|channel| async move { (channel.name(), channel.send(title, content).await) }),
        )
        .await;

        for (name, result) in results {
            match result {
                Ok(()) => tracing::info!(channel = name, "notification delivered"),
                Err(e) => tracing::error!(channel = name, error = %e, "notification delivery failed"),
            }
        }
    }
}
