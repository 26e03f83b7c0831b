//! Hand-rolled SMTP notification channel
//!
//! Delivers the digest as an HTML email over a raw TCP connection, speaking
//! the wire protocol directly (see [`session`]). The connection parameters
//! select the transport mode: `secure` encrypts from the first byte,
//! `starttls` upgrades the plaintext connection in-band after the initial
//! greeting exchange, and both flags off means plaintext throughout.

pub mod session;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::{delivery_timestamp, Channel, ChannelResult};
use session::SmtpSession;

pub use session::SmtpError;

/// Deadline for one complete delivery, connect to QUIT
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP connection and message parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Server hostname
    pub host: String,

    /// Server port (25, 465, 587, 2525)
    pub port: u16,

    /// Implicit TLS from the first byte (port 465 style)
    pub secure: bool,

    /// STARTTLS upgrade after the greeting exchange (port 587 style)
    pub starttls: bool,

    /// Account name for AUTH LOGIN
    pub user: String,

    /// Account password or app-specific password
    pub pass: String,

    /// Envelope and header sender
    pub from: String,

    /// Envelope and header recipient
    pub to: String,
}

/// Mail notification channel.
pub struct SmtpChannel {
    config: SmtpConfig,
}

impl SmtpChannel {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Run one delivery: connect, negotiate the transport, then drive the
    /// envelope exchange. The transport is released on every exit path.
    async fn deliver(&self, message: &str) -> Result<(), SmtpError> {
        let config = &self.config;
        tracing::info!(host = %config.host, port = config.port, "connecting to mail server");

        let tcp = TcpStream::connect((config.host.as_str(), config.port))
            .await
            .map_err(SmtpError::Connect)?;

        if config.secure {
            let tls = tls_connect(&config.host, tcp).await?;
            let mut session = SmtpSession::new(tls);
            session.greeting().await?;
            session.ehlo(&config.host).await?;
            Self::transfer(session, config, message).await
        } else if config.starttls {
            let mut session = SmtpSession::new(tcp);
            session.greeting().await?;
            session.ehlo(&config.host).await?;
            session.starttls().await?;

            // The server forgets previously negotiated capabilities across
            // the upgrade, so the greeting exchange is repeated on the
            // encrypted stream.
            let tls = tls_connect(&config.host, session.into_inner()).await?;
            let mut session = SmtpSession::new(tls);
            session.ehlo(&config.host).await?;
            Self::transfer(session, config, message).await
        } else {
            let mut session = SmtpSession::new(tcp);
            session.greeting().await?;
            session.ehlo(&config.host).await?;
            Self::transfer(session, config, message).await
        }
    }

    /// Drive the envelope exchange, then release the transport regardless of
    /// the outcome.
    async fn transfer<S: AsyncRead + AsyncWrite + Unpin + Send>(
        mut session: SmtpSession<S>,
        config: &SmtpConfig,
        message: &str,
    ) -> Result<(), SmtpError> {
        let result = Self::envelope(&mut session, config, message).await;
        session.shutdown().await;
        result
    }

    async fn envelope<S: AsyncRead + AsyncWrite + Unpin + Send>(
        session: &mut SmtpSession<S>,
        config: &SmtpConfig,
        message: &str,
    ) -> Result<(), SmtpError> {
        session.auth_login(&config.user, &config.pass).await?;
        session.mail_from(&config.from).await?;
        session.rcpt_to(&config.to).await?;
        session.data().await?;
        session.body(message).await?;
        session.quit().await?;
        tracing::info!(to = %config.to, "mail delivered");
        Ok(())
    }
}

#[async_trait]
impl Channel for SmtpChannel {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, title: &str, content: &str) -> ChannelResult<()> {
        let html = render_digest_html(title, content);
        let message = build_message(&self.config, title, &html);

        tokio::time::timeout(DELIVERY_TIMEOUT, self.deliver(&message))
            .await
            .map_err(|_| SmtpError::Timeout)??;

        Ok(())
    }
}

/// Upgrade a stream to TLS against the given hostname.
async fn tls_connect<S: AsyncRead + AsyncWrite + Unpin + Send>(
    host: &str,
    stream: S,
) -> Result<tokio_native_tls::TlsStream<S>, SmtpError> {
    let connector = native_tls::TlsConnector::new().map_err(|e| SmtpError::Tls(e.to_string()))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);
    connector
        .connect(host, stream)
        .await
        .map_err(|e| SmtpError::Tls(e.to_string()))
}

/// Assemble the RFC 822 message: headers, blank line, base64-encoded HTML
/// body. The Subject uses an encoded word so non-ASCII titles survive.
fn build_message(config: &SmtpConfig, title: &str, html: &str) -> String {
    [
        format!("From: {}", config.from),
        format!("To: {}", config.to),
        format!("Subject: =?UTF-8?B?{}?=", BASE64.encode(title)),
        "MIME-Version: 1.0".to_string(),
        "Content-Type: text/html; charset=UTF-8".to_string(),
        "Content-Transfer-Encoding: base64".to_string(),
        String::new(),
        wrap_base64(&BASE64.encode(html)),
    ]
    .join("\r\n")
}

/// Fold a base64 payload to 76-character lines.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| std::str::from_utf8(chunk).expect("base64 is ascii"))
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Minimal HTML digest around the run log.
fn render_digest_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="font-size: 20px;">{title}</h1>
  <pre style="background: #f8f9fa; padding: 15px; border-radius: 6px; white-space: pre-wrap;">{content}</pre>
  <p style="color: #6c757d; font-size: 12px;">发送时间: {timestamp}</p>
</body>
</html>"#,
        title = escape_html(title),
        content = escape_html(content),
        timestamp = delivery_timestamp(),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
