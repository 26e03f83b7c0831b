//! Durable key-value storage for attendance state
//!
//! The engine persists two kinds of records across runs: per-character
//! attendance flags (keyed by date and uid) and per-account binding lists
//! (keyed by user id). Both live behind the [`KvStore`] trait so the durable
//! backend stays swappable; the shipped backend is Redis, and tests use the
//! in-memory implementation.

pub mod keys;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Redis command failed
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Connection pool error
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Stored value could not be decoded
    #[error("malformed stored value for key {key}: {reason}")]
    Malformed { key: String, reason: String },
}

/// Abstract durable key-value store.
///
/// Keys are opaque strings; the engine imposes the `{prefix}{date}:{id}`
/// convention on top (see [`keys`]). Implementations must be safe to share
/// across concurrent tasks within a run.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; `None` when the key is absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Enumerate every key currently stored.
    async fn list_keys(&self) -> StoreResult<Vec<String>>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Marker value stored for a completed attendance record.
pub const ATTENDED: &str = "1";

/// Read an attendance flag; absence means "not yet attended today".
pub async fn get_flag(store: &dyn KvStore, key: &str) -> StoreResult<bool> {
    Ok(store.get(key).await?.is_some())
}

/// Read a bindings record (JSON array of uid strings).
pub async fn get_bindings(store: &dyn KvStore, key: &str) -> StoreResult<Option<Vec<String>>> {
    match store.get(key).await? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Overwrite a bindings record with a fresh uid list.
pub async fn set_bindings(store: &dyn KvStore, key: &str, uids: &[String]) -> StoreResult<()> {
    let raw = serde_json::to_string(uids).expect("uid list serializes");
    store.set(key, &raw).await
}
