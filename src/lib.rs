//! qiandao - Skland daily attendance bot
//!
//! Performs the daily attendance action for a set of Skland game accounts
//! and reports a digest through independently configured notification
//! channels.
//!
//! # Architecture
//!
//! - [`config`] - Environment-driven configuration
//! - [`skland`] - Remote game service client (authorize, bindings, attendance)
//! - [`attendance`] - Orchestration engine, run log, cleanup sweep
//! - [`store`] - Durable key-value storage for attendance state
//! - [`notify`] - Notification fanout, including the raw SMTP client
//! - [`utils`] - Retry policy and chunk batching
//!
//! # Example
//!
//! ```no_run
//! use qiandao::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!     qiandao::commands::run::run().await?;
//!     Ok(())
//! }
//! ```

pub mod attendance;
pub mod commands;
pub mod config;
pub mod error;
pub mod notify;
pub mod skland;
pub mod store;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attendance::{AttendanceEngine, EngineConfig, RunLog};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::notify::{Channel, Notifier};
    pub use crate::skland::{AttendanceService, Character, Session, SklandClient};
    pub use crate::store::{KvStore, MemoryStore, RedisStore};
}
