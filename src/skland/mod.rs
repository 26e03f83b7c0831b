//! Skland remote service client
//!
//! The attendance engine talks to the game service through the
//! [`AttendanceService`] trait: authorize an account token into a session,
//! enumerate the characters bound to the account, and submit the daily
//! attendance for one character. The HTTP implementation lives in
//! [`client`]; tests substitute their own implementation.

pub mod client;
pub mod error;

use async_trait::async_trait;

pub use client::SklandClient;
pub use error::ServiceError;

/// Ephemeral per-run credentials for one account.
///
/// Obtained once per account per run and never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub cred: String,
    pub sign_token: String,
    pub user_id: String,
}

/// One game character bound to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub uid: String,
    /// Realm identifier; `"1"` is the official server, anything else is B 服.
    pub channel_master_id: String,
    pub nick_name: String,
}

impl Character {
    /// Realm label used in user-facing log lines.
    pub fn realm_name(&self) -> &'static str {
        if self.channel_master_id == "1" {
            "官服"
        } else {
            "B 服"
        }
    }

    /// Privacy-masked nickname: `张三丰#1234` becomes `张*丰#1234`.
    ///
    /// Names of two characters or fewer are left as-is.
    pub fn masked_nick_name(&self) -> String {
        let (name, number) = match self.nick_name.split_once('#') {
            Some((name, number)) => (name, Some(number)),
            None => (self.nick_name.as_str(), None),
        };

        let chars: Vec<char> = name.chars().collect();
        if chars.len() <= 2 {
            return self.nick_name.clone();
        }

        let mut masked = String::new();
        masked.push(chars[0]);
        masked.push_str(&"*".repeat(chars.len() - 2));
        masked.push(chars[chars.len() - 1]);
        if let Some(number) = number {
            masked.push('#');
            masked.push_str(number);
        }
        masked
    }

    /// Full display name, e.g. `官服角色张*丰#1234`.
    pub fn display_name(&self) -> String {
        format!("{}角色{}", self.realm_name(), self.masked_nick_name())
    }
}

/// One item awarded by a successful attendance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub name: String,
    pub count: i64,
}

/// Outcome of an attendance submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceOutcome {
    /// The service accepted the submission.
    Success { awards: Vec<Award> },
    /// The service reported (via an empty response) that today's attendance
    /// was already completed server-side.
    AlreadyDone,
}

/// Remote game service operations consumed by the attendance engine.
#[async_trait]
pub trait AttendanceService: Send + Sync {
    /// Exchange an account token for a session (OAuth grant + cred sign-in).
    async fn authorize(&self, token: &str) -> Result<Session, ServiceError>;

    /// Enumerate the Arknights characters bound to the account.
    async fn list_characters(&self, session: &Session) -> Result<Vec<Character>, ServiceError>;

    /// Submit the daily attendance for one character.
    async fn submit_attendance(
        &self,
        session: &Session,
        character: &Character,
    ) -> Result<AttendanceOutcome, ServiceError>;
}
