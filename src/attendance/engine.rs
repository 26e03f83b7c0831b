//! Attendance orchestration engine
//!
//! Accounts are processed strictly sequentially so log ordering stays
//! deterministic and one account's failure cannot starve the others; only
//! the characters inside one chunk run concurrently. Every remote call is
//! wrapped in the uniform retry policy. Per-character attendance is
//! idempotent: a persisted record short-circuits the remote call, and the
//! service's 403 duplicate signal is normalized to success.

use chrono::NaiveDate;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Error;
use crate::skland::{AttendanceOutcome, AttendanceService, Character, ServiceError, Session};
use crate::store::keys::{attendance_key, bindings_key};
use crate::store::{self, KvStore, ATTENDED};
use crate::utils::{chunked, with_retry, RetryConfig};

use super::log::RunLog;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum characters attended concurrently within one chunk
    pub concurrency_limit: usize,

    /// Pause between successive chunks in milliseconds
    pub chunk_delay_ms: u64,

    /// Storage prefix for attendance records
    pub attendance_prefix: String,

    /// Storage prefix for binding records
    pub bindings_prefix: String,

    /// Retry policy applied to every remote call
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            chunk_delay_ms: 1000,
            attendance_prefix: "attendance:".to_string(),
            bindings_prefix: "bindings:".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

/// Result of one character's attendance attempt.
struct CharacterOutcome {
    lines: Vec<(String, bool)>,
    success: bool,
}

impl CharacterOutcome {
    fn success(line: String) -> Self {
        Self {
            lines: vec![(line, false)],
            success: true,
        }
    }

    fn failure(line: String) -> Self {
        Self {
            lines: vec![(line, true)],
            success: false,
        }
    }
}

/// Orchestrates one attendance run over all accounts.
///
/// Holds only borrowed collaborators; construct one per run with the run's
/// fixed "today" date and drop it when the run ends.
pub struct AttendanceEngine<'a> {
    service: &'a dyn AttendanceService,
    store: &'a dyn KvStore,
    config: &'a EngineConfig,
    today: NaiveDate,
}

impl<'a> AttendanceEngine<'a> {
    pub fn new(
        service: &'a dyn AttendanceService,
        store: &'a dyn KvStore,
        config: &'a EngineConfig,
        today: NaiveDate,
    ) -> Self {
        Self {
            service,
            store,
            config,
            today,
        }
    }

    /// Process every account; returns the total number of successfully
    /// attended characters. Never fails: every per-account error is caught,
    /// logged with the error flag, and the loop advances.
    pub async fn run(&self, accounts: &[String], log: &mut RunLog) -> usize {
        log.log(format!(
            "## 明日方舟签到\n\n开始执行签到任务，共 {} 个账号",
            accounts.len()
        ));

        let mut total_success = 0;
        for (index, token) in accounts.iter().enumerate() {
            let number = index + 1;
            tracing::info!(account = number, total = accounts.len(), "processing account");
            log.log(format!("### 账号 {number}/{}", accounts.len()));

            match self.process_account(token, number, log).await {
                Ok(count) => total_success += count,
                Err(e) => {
                    log.error(format!("处理账号 {number} 时发生错误: {e}"));
                }
            }
        }

        total_success
    }

    /// One account: authorize, short-circuit, enumerate, attend in chunks.
    async fn process_account(
        &self,
        token: &str,
        number: usize,
        log: &mut RunLog,
    ) -> Result<usize, Error> {
        let session = with_retry(&self.config.retry, || self.service.authorize(token)).await?;

        if self.all_attended(&session.user_id).await? {
            log.log(format!("账号 {number} 的所有角色已经签到完成，跳过"));
            return Ok(0);
        }

        let characters =
            with_retry(&self.config.retry, || self.service.list_characters(&session)).await?;

        // Refresh the persisted binding list; future runs use it for the
        // short-circuit check above.
        let uids: Vec<String> = characters.iter().map(|c| c.uid.clone()).collect();
        store::set_bindings(
            self.store,
            &bindings_key(&self.config.bindings_prefix, &session.user_id),
            &uids,
        )
        .await?;

        log.log(format!(
            "账号 {number} 共有 {} 个角色需要签到",
            characters.len()
        ));

        let chunks = chunked(characters, self.config.concurrency_limit);
        let chunk_count = chunks.len();
        let mut success = 0;

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            if chunk_count > 1 {
                tracing::info!(
                    chunk = chunk_index + 1,
                    chunks = chunk_count,
                    "processing character chunk"
                );
            }

            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|character| self.attend_character(&session, character)),
            )
            .await;

            // join_all preserves input order, so the log stays deterministic
            // regardless of completion order inside the chunk.
            for outcome in outcomes {
                for (line, is_error) in outcome.lines {
                    log.append(line, is_error);
                }
                if outcome.success {
                    success += 1;
                }
            }

            if chunk_index + 1 < chunk_count {
                tracing::debug!(
                    delay_ms = self.config.chunk_delay_ms,
                    "pausing before next chunk"
                );
                tokio::time::sleep(Duration::from_millis(self.config.chunk_delay_ms)).await;
            }
        }

        Ok(success)
    }

    /// Whether every character in the account's persisted binding list has a
    /// completed attendance record for today. Absent binding list means the
    /// account was never seen before, so it cannot be skipped.
    async fn all_attended(&self, user_id: &str) -> Result<bool, Error> {
        let key = bindings_key(&self.config.bindings_prefix, user_id);
        let Some(uids) = store::get_bindings(self.store, &key).await? else {
            return Ok(false);
        };
        if uids.is_empty() {
            return Ok(false);
        }

        for uid in &uids {
            let key = attendance_key(&self.config.attendance_prefix, self.today, uid);
            if !store::get_flag(self.store, &key).await? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Attend one character. Independent and idempotent: never touches the
    /// remote service when today's record already exists, and persists the
    /// record on every success-equivalent outcome.
    async fn attend_character(
        &self,
        session: &Session,
        character: &Character,
    ) -> CharacterOutcome {
        let name = character.display_name();
        let key = attendance_key(&self.config.attendance_prefix, self.today, &character.uid);

        match store::get_flag(self.store, &key).await {
            Ok(true) => return CharacterOutcome::success(format!("{name}今天已经签到过了")),
            Ok(false) => {}
            Err(e) => {
                return CharacterOutcome::failure(format!("{name}签到状态读取失败: {e}"));
            }
        }

        let result = with_retry(&self.config.retry, || {
            self.service.submit_attendance(session, character)
        })
        .await;

        match result {
            Ok(AttendanceOutcome::Success { awards }) => {
                if let Err(e) = self.store.set(&key, ATTENDED).await {
                    return CharacterOutcome::failure(format!("{name}签到记录写入失败: {e}"));
                }
                let awards = awards
                    .iter()
                    .map(|a| format!("「{}」{}个", a.name, a.count))
                    .collect::<Vec<_>>()
                    .join(",");
                let message = if awards.is_empty() {
                    format!("{name}签到成功")
                } else {
                    format!("{name}签到成功, 获得了{awards}")
                };
                CharacterOutcome::success(message)
            }
            Ok(AttendanceOutcome::AlreadyDone) => self.record_already_attended(&name, &key).await,
            Err(e) if e.is_duplicate_signal() => self.record_already_attended(&name, &key).await,
            Err(ServiceError::Rejected { message, .. }) => {
                CharacterOutcome::failure(format!("{name}签到失败, 错误消息: {message}"))
            }
            Err(e) => CharacterOutcome::failure(format!("{name}签到过程中出现错误: {e}")),
        }
    }

    /// Persist the record for a server-side "already attended" outcome.
    async fn record_already_attended(&self, name: &str, key: &str) -> CharacterOutcome {
        if let Err(e) = self.store.set(key, ATTENDED).await {
            return CharacterOutcome::failure(format!("{name}签到记录写入失败: {e}"));
        }
        CharacterOutcome::success(format!("{name}今天已经签到过了"))
    }
}
