//! Attendance orchestration
//!
//! One run processes every configured account strictly in order: authorize,
//! short-circuit if every known character already attended today, refresh the
//! persisted binding list, then submit attendance for each character in
//! bounded-concurrency chunks. The run log accumulates the user-facing
//! digest; a sliding-window sweep removes stale records at the end.

pub mod cleanup;
pub mod engine;
pub mod log;

pub use engine::{AttendanceEngine, EngineConfig};
pub use log::RunLog;
