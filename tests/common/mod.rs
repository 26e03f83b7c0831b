//! Common test utilities

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qiandao::attendance::EngineConfig;
use qiandao::skland::{
    AttendanceOutcome, AttendanceService, Award, Character, ServiceError, Session,
};
use qiandao::utils::RetryConfig;

/// Scripted behavior for one character's attendance submission
#[derive(Clone)]
#[allow(dead_code)]
pub enum SubmitBehavior {
    /// Accept and return the given awards
    Success(Vec<Award>),
    /// Empty-response "already attended server-side"
    AlreadyDone,
    /// HTTP 403 duplicate-submission signal
    Forbidden,
    /// Explicit rejection with a message
    Rejected(String),
    /// Fail with HTTP 500 while the counter is positive, then succeed
    FailTimes(Arc<AtomicUsize>),
}

/// Scriptable in-memory attendance service
pub struct MockService {
    pub characters: Vec<Character>,
    /// Tokens whose authorization always fails
    pub fail_tokens: Vec<String>,
    /// Per-uid submission behavior; defaults to `Success(vec![])`
    pub behaviors: HashMap<String, SubmitBehavior>,
    /// Virtual duration of one submission, to let in-flight calls overlap
    pub submit_delay_ms: u64,

    pub authorize_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockService {
    pub fn new(characters: Vec<Character>) -> Self {
        Self {
            characters,
            fail_tokens: Vec::new(),
            behaviors: HashMap::new(),
            submit_delay_ms: 0,
            authorize_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn with_behavior(mut self, uid: &str, behavior: SubmitBehavior) -> Self {
        self.behaviors.insert(uid.to_string(), behavior);
        self
    }
}

#[async_trait]
impl AttendanceService for MockService {
    async fn authorize(&self, token: &str) -> Result<Session, ServiceError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tokens.iter().any(|t| t == token) {
            return Err(ServiceError::Auth("invalid token".to_string()));
        }
        Ok(Session {
            cred: "cred".to_string(),
            sign_token: "sign".to_string(),
            user_id: format!("user-{token}"),
        })
    }

    async fn list_characters(&self, _session: &Session) -> Result<Vec<Character>, ServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.characters.clone())
    }

    async fn submit_attendance(
        &self,
        _session: &Session,
        character: &Character,
    ) -> Result<AttendanceOutcome, ServiceError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if self.submit_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.submit_delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behaviors.get(&character.uid) {
            None => Ok(AttendanceOutcome::Success { awards: vec![] }),
            Some(SubmitBehavior::Success(awards)) => Ok(AttendanceOutcome::Success {
                awards: awards.clone(),
            }),
            Some(SubmitBehavior::AlreadyDone) => Ok(AttendanceOutcome::AlreadyDone),
            Some(SubmitBehavior::Forbidden) => Err(ServiceError::Status { status: 403 }),
            Some(SubmitBehavior::Rejected(message)) => Err(ServiceError::Rejected {
                code: 10001,
                message: message.clone(),
            }),
            Some(SubmitBehavior::FailTimes(remaining)) => {
                if remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    Err(ServiceError::Status { status: 500 })
                } else {
                    Ok(AttendanceOutcome::Success { awards: vec![] })
                }
            }
        }
    }
}

/// Engine configuration tuned for tests: no real delays.
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        concurrency_limit: 5,
        chunk_delay_ms: 0,
        attendance_prefix: "attendance:".to_string(),
        bindings_prefix: "bindings:".to_string(),
        retry: RetryConfig::with_delay(3, 0),
    }
}

/// Create a character with the given uid on the official server.
pub fn character(uid: &str) -> Character {
    Character {
        uid: uid.to_string(),
        channel_master_id: "1".to_string(),
        nick_name: format!("博士{uid}#1234"),
    }
}

/// Create `n` characters with sequential uids.
#[allow(dead_code)]
pub fn characters(n: usize) -> Vec<Character> {
    (1..=n).map(|i| character(&i.to_string())).collect()
}
