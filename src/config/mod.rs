//! Configuration management
//!
//! All configuration comes from environment variables, matching the way the
//! job is deployed (a scheduler invokes the binary with its environment
//! prepared). Presence of a notification channel's variables activates that
//! channel; absence silently disables it.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::attendance::EngineConfig;
use crate::notify::SmtpConfig;
use crate::store::redis::RedisConfig;
use crate::utils::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Account tokens, one attendance pass each
    pub accounts: Vec<String>,

    /// Orchestration engine configuration
    pub engine: EngineConfig,

    /// Durable storage configuration
    pub storage: RedisConfig,

    /// Notification channel configuration
    pub notify: NotifyConfig,
}

/// Notification channel configuration
///
/// Each `Some` field activates one channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// ServerChan send key
    pub server_chan_key: Option<String>,

    /// SMTP connection parameters
    pub smtp: Option<SmtpConfig>,

    /// Generic JSON webhook URL
    pub webhook_url: Option<String>,

    /// DingTalk robot webhook URL
    pub ding_talk_webhook: Option<String>,

    /// WeChat Work robot webhook URL
    pub we_chat_work_webhook: Option<String>,

    /// Slack incoming webhook URL
    pub slack_webhook: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let tokens = match std::env::var("SKLAND_TOKEN") {
            Ok(v) => v,
            Err(_) => bail!("SKLAND_TOKEN is not set"),
        };
        let accounts: Vec<String> = tokens
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let concurrency_limit = std::env::var("CONCURRENT_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(5);

        let chunk_delay_ms = std::env::var("CHUNK_DELAY")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);

        let attendance_prefix = std::env::var("ATTENDANCE_STORAGE_PREFIX")
            .unwrap_or_else(|_| "attendance:".to_string());

        let bindings_prefix =
            std::env::var("BINDINGS_STORAGE_PREFIX").unwrap_or_else(|_| "bindings:".to_string());

        let retry_attempts = std::env::var("RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let retry_delay_ms = std::env::var("RETRY_DELAY")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1000);

        Ok(Self {
            accounts,
            engine: EngineConfig {
                concurrency_limit,
                chunk_delay_ms,
                attendance_prefix,
                bindings_prefix,
                retry: RetryConfig::with_delay(retry_attempts, retry_delay_ms),
            },
            storage: RedisConfig::from_env(),
            notify: NotifyConfig::from_env(),
        })
    }

    /// Validate the loaded configuration.
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            bail!("SKLAND_TOKEN contains no account tokens");
        }
        if self.engine.concurrency_limit == 0 {
            bail!("CONCURRENT_LIMIT must be positive");
        }
        Ok(())
    }
}

impl NotifyConfig {
    /// Build the channel set from environment variables.
    pub fn from_env() -> Self {
        Self {
            server_chan_key: env_opt("SERVERCHAN_SENDKEY"),
            smtp: smtp_from_env(),
            webhook_url: env_opt("WEBHOOK_URL"),
            ding_talk_webhook: env_opt("DINGTALK_WEBHOOK"),
            we_chat_work_webhook: env_opt("WECHAT_WORK_WEBHOOK"),
            slack_webhook: env_opt("SLACK_WEBHOOK"),
        }
    }
}

/// The mail channel needs host, user, pass and a recipient; anything less
/// leaves it disabled.
fn smtp_from_env() -> Option<SmtpConfig> {
    let host = env_opt("SMTP_HOST")?;
    let user = env_opt("SMTP_USER")?;
    let pass = env_opt("SMTP_PASS")?;
    let to = env_opt("EMAIL_TO")?;

    let port = std::env::var("SMTP_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(587);

    let secure = std::env::var("SMTP_SECURE").map(|v| v == "true").unwrap_or(false);

    // STARTTLS defaults to on; only an explicit "false" disables it
    let starttls = std::env::var("SMTP_TLS").map(|v| v != "false").unwrap_or(true);

    let from = env_opt("EMAIL_FROM").unwrap_or_else(|| user.clone());

    Some(SmtpConfig {
        host,
        port,
        secure,
        starttls,
        user,
        pass,
        from,
        to,
    })
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
