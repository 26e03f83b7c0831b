//! SMTP wire protocol session
//!
//! A strict half-duplex requester over any duplex byte stream: every command
//! is written and its reply fully read before the next command goes out. The
//! session is generic over the transport so the STARTTLS upgrade can swap
//! the concrete stream (plaintext TCP to TLS) without mutating a live
//! reader/writer; the caller consumes the session with [`SmtpSession::into_inner`]
//! and builds a new one over the upgraded stream.
//!
//! Replies are parsed multi-line aware (`250-…` continuations until the
//! `250 ` terminal line) and classified by status code: any 4xx/5xx reply
//! aborts the exchange.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single reply, to fail fast on a misbehaving server
const MAX_REPLY_BYTES: usize = 16 * 1024;

/// Errors that can occur inside the mail transport
#[derive(Error, Debug)]
pub enum SmtpError {
    /// TCP connect failed
    #[error("connection failed: {0}")]
    Connect(std::io::Error),

    /// TLS setup or handshake failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// Read or write on the transport failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server replied with a 4xx/5xx status
    #[error("server rejected command with {code}: {reply}")]
    Rejected { code: u16, reply: String },

    /// The server's reply did not follow the protocol grammar
    #[error("malformed server response: {0}")]
    Malformed(String),

    /// The server closed the connection mid-exchange
    #[error("connection closed by server")]
    Closed,

    /// The overall delivery deadline elapsed
    #[error("timed out during mail delivery")]
    Timeout,
}

/// One parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub text: String,
}

/// Protocol session over one transport.
pub struct SmtpSession<S> {
    stream: S,
    buf: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> SmtpSession<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    /// Take back the transport, consuming the session. Used by the STARTTLS
    /// upgrade to hand the plaintext stream to the TLS connector.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read the server greeting (the one reply not preceded by a command).
    pub async fn greeting(&mut self) -> Result<SmtpReply, SmtpError> {
        self.read_reply().await
    }

    /// Send EHLO. Repeated after a transport upgrade because the server
    /// discards previously negotiated capabilities.
    pub async fn ehlo(&mut self, host: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("EHLO {host}")).await
    }

    pub async fn starttls(&mut self) -> Result<SmtpReply, SmtpError> {
        self.command("STARTTLS").await
    }

    /// AUTH LOGIN challenge-response: the username and password each answer
    /// a server solicitation, base64-encoded, never in clear text.
    pub async fn auth_login(&mut self, user: &str, pass: &str) -> Result<(), SmtpError> {
        self.command("AUTH LOGIN").await?;
        self.command_sensitive(&BASE64.encode(user)).await?;
        self.command_sensitive(&BASE64.encode(pass)).await?;
        Ok(())
    }

    pub async fn mail_from(&mut self, from: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    pub async fn rcpt_to(&mut self, to: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    pub async fn data(&mut self) -> Result<SmtpReply, SmtpError> {
        self.command("DATA").await
    }

    /// Transfer the message body and the end-of-data marker (a line holding
    /// a single period), then read the acceptance reply.
    pub async fn body(&mut self, message: &str) -> Result<SmtpReply, SmtpError> {
        self.stream.write_all(message.as_bytes()).await?;
        self.stream.write_all(b"\r\n.\r\n").await?;
        self.stream.flush().await?;
        tracing::debug!(bytes = message.len(), "smtp body transferred");
        self.read_reply().await
    }

    pub async fn quit(&mut self) -> Result<SmtpReply, SmtpError> {
        self.command("QUIT").await
    }

    /// Shut down the write side and release the transport. Safe to call on
    /// any exit path; failures are ignored.
    pub async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }

    /// Write one command line and read its reply.
    pub async fn command(&mut self, line: &str) -> Result<SmtpReply, SmtpError> {
        tracing::debug!(command = %line, "smtp send");
        self.write_line(line).await?;
        self.read_reply().await
    }

    /// Like [`command`](Self::command) but never logs the payload.
    async fn command_sensitive(&mut self, line: &str) -> Result<SmtpReply, SmtpError> {
        tracing::debug!("smtp send: <credential>");
        self.write_line(line).await?;
        self.read_reply().await
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SmtpError> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one complete (possibly multi-line) reply and classify it.
    async fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        loop {
            if let Some(reply) = self.parse_buffered()? {
                tracing::debug!(code = reply.code, "smtp reply");
                if reply.code >= 400 {
                    return Err(SmtpError::Rejected {
                        code: reply.code,
                        reply: reply.text,
                    });
                }
                return Ok(reply);
            }

            if self.buf.len() > MAX_REPLY_BYTES {
                return Err(SmtpError::Malformed("oversized reply".to_string()));
            }

            let mut chunk = [0u8; 512];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(SmtpError::Closed);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Try to pop one complete reply off the buffer.
    ///
    /// A reply is complete once a terminal line (`NNN text` or bare `NNN`)
    /// arrives; `NNN-text` lines are continuations.
    fn parse_buffered(&mut self) -> Result<Option<SmtpReply>, SmtpError> {
        let mut start = 0;
        while let Some(offset) = find_crlf(&self.buf[start..]) {
            let line_end = start + offset;
            let line = &self.buf[start..line_end];

            if line.len() < 3 || !line[..3].iter().all(|b| b.is_ascii_digit()) {
                return Err(SmtpError::Malformed(
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }

            if line.len() == 3 || line[3] == b' ' {
                let code: u16 = std::str::from_utf8(&line[..3])
                    .expect("ascii digits")
                    .parse()
                    .expect("three digits fit u16");
                let text = String::from_utf8_lossy(&self.buf[..line_end])
                    .replace("\r\n", "\n");
                self.buf.drain(..line_end + 2);
                return Ok(Some(SmtpReply { code, text }));
            }

            // continuation line, keep scanning
            start = line_end + 2;
        }
        Ok(None)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    async fn expect_line<R: AsyncRead + Unpin>(reader: &mut BufReader<R>, expected: &str) {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim_end_matches("\r\n"), expected);
    }

    #[tokio::test]
    async fn test_single_line_reply() {
        let (client, mut server) = duplex(4096);
        let mut session = SmtpSession::new(client);

        server.write_all(b"220 mail.example.com ESMTP\r\n").await.unwrap();
        let reply = session.greeting().await.unwrap();
        assert_eq!(reply.code, 220);
        assert!(reply.text.contains("mail.example.com"));
    }

    #[tokio::test]
    async fn test_multi_line_reply() {
        let (client, mut server) = duplex(4096);
        let mut session = SmtpSession::new(client);

        server
            .write_all(b"250-mail.example.com\r\n250-SIZE 35882577\r\n250 STARTTLS\r\n")
            .await
            .unwrap();
        let reply = session.greeting().await.unwrap();
        assert_eq!(reply.code, 250);
        assert!(reply.text.contains("SIZE"));
        assert!(reply.text.contains("STARTTLS"));
    }

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let (client, mut server) = duplex(4096);
        let mut session = SmtpSession::new(client);

        let writer = tokio::spawn(async move {
            server.write_all(b"250-mail.exam").await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            server.write_all(b"ple.com\r\n250 ok\r\n").await.unwrap();
            server
        });

        let reply = session.greeting().await.unwrap();
        assert_eq!(reply.code, 250);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_reply_aborts() {
        let (client, mut server) = duplex(4096);
        let mut session = SmtpSession::new(client);

        server.write_all(b"550 not welcome\r\n").await.unwrap();
        let err = session.greeting().await.unwrap_err();
        assert!(matches!(err, SmtpError::Rejected { code: 550, .. }));
    }

    #[tokio::test]
    async fn test_malformed_reply() {
        let (client, mut server) = duplex(4096);
        let mut session = SmtpSession::new(client);

        server.write_all(b"hello there\r\n").await.unwrap();
        let err = session.greeting().await.unwrap_err();
        assert!(matches!(err, SmtpError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let (client, server) = duplex(4096);
        let mut session = SmtpSession::new(client);

        drop(server);
        let err = session.greeting().await.unwrap_err();
        assert!(matches!(err, SmtpError::Closed));
    }

    /// The exact command ordering of the STARTTLS path: EHLO, STARTTLS, then
    /// a second EHLO that must be the first thing written on the upgraded
    /// transport, followed by the AUTH LOGIN exchange.
    #[tokio::test]
    async fn test_starttls_handshake_ordering() {
        let (client_plain, server_plain) = duplex(4096);
        let (client_tls, server_tls) = duplex(4096);

        let server = tokio::spawn(async move {
            let mut plain = BufReader::new(server_plain);
            plain
                .get_mut()
                .write_all(b"220 mail.example.com ESMTP\r\n")
                .await
                .unwrap();
            expect_line(&mut plain, "EHLO mail.example.com").await;
            plain
                .get_mut()
                .write_all(b"250-mail.example.com\r\n250 STARTTLS\r\n")
                .await
                .unwrap();
            expect_line(&mut plain, "STARTTLS").await;
            plain
                .get_mut()
                .write_all(b"220 ready for TLS\r\n")
                .await
                .unwrap();

            let mut tls = BufReader::new(server_tls);
            expect_line(&mut tls, "EHLO mail.example.com").await;
            tls.get_mut().write_all(b"250 ok\r\n").await.unwrap();
            expect_line(&mut tls, "AUTH LOGIN").await;
            tls.get_mut()
                .write_all(b"334 VXNlcm5hbWU6\r\n")
                .await
                .unwrap();
            expect_line(&mut tls, &BASE64.encode("user@example.com")).await;
            tls.get_mut()
                .write_all(b"334 UGFzc3dvcmQ6\r\n")
                .await
                .unwrap();
            expect_line(&mut tls, &BASE64.encode("hunter2")).await;
            tls.get_mut()
                .write_all(b"235 authenticated\r\n")
                .await
                .unwrap();
        });

        let mut session = SmtpSession::new(client_plain);
        session.greeting().await.unwrap();
        session.ehlo("mail.example.com").await.unwrap();
        session.starttls().await.unwrap();

        // upgrade: the plaintext stream is consumed, a fresh session drives
        // the encrypted transport, and the greeting exchange is repeated
        let _plain = session.into_inner();
        let mut session = SmtpSession::new(client_tls);
        session.ehlo("mail.example.com").await.unwrap();
        session.auth_login("user@example.com", "hunter2").await.unwrap();

        server.await.unwrap();
    }

    /// Full envelope exchange in strict request/reply alternation.
    #[tokio::test]
    async fn test_envelope_sequence() {
        let (client, server_end) = duplex(8192);

        let server = tokio::spawn(async move {
            let mut server = BufReader::new(server_end);
            server
                .get_mut()
                .write_all(b"220 mail.example.com\r\n")
                .await
                .unwrap();
            expect_line(&mut server, "EHLO mail.example.com").await;
            server.get_mut().write_all(b"250 ok\r\n").await.unwrap();
            expect_line(&mut server, "MAIL FROM:<bot@example.com>").await;
            server.get_mut().write_all(b"250 ok\r\n").await.unwrap();
            expect_line(&mut server, "RCPT TO:<admin@example.com>").await;
            server.get_mut().write_all(b"250 ok\r\n").await.unwrap();
            expect_line(&mut server, "DATA").await;
            server
                .get_mut()
                .write_all(b"354 end with <CRLF>.<CRLF>\r\n")
                .await
                .unwrap();
            expect_line(&mut server, "Subject: test").await;
            expect_line(&mut server, "").await;
            expect_line(&mut server, "hello").await;
            expect_line(&mut server, ".").await;
            server.get_mut().write_all(b"250 queued\r\n").await.unwrap();
            expect_line(&mut server, "QUIT").await;
            server.get_mut().write_all(b"221 bye\r\n").await.unwrap();
        });

        let mut session = SmtpSession::new(client);
        session.greeting().await.unwrap();
        session.ehlo("mail.example.com").await.unwrap();
        session.mail_from("bot@example.com").await.unwrap();
        session.rcpt_to("admin@example.com").await.unwrap();
        let reply = session.data().await.unwrap();
        assert_eq!(reply.code, 354);
        session.body("Subject: test\r\n\r\nhello").await.unwrap();
        session.quit().await.unwrap();
        session.shutdown().await;

        server.await.unwrap();
    }
}
