//! Sliding-window cleanup of persisted records
//!
//! Runs once per invocation after all accounts are processed. Any key whose
//! date segment is strictly older than seven days before today (Asia/
//! Shanghai) is removed; keys without a date segment (binding records keyed
//! by user id) are left alone. Deletions are concurrent and best-effort.

use chrono::{Duration, NaiveDate};
use futures::future::join_all;

use crate::store::keys::extract_date;
use crate::store::KvStore;

/// Retention window in days
const RETENTION_DAYS: i64 = 7;

/// Remove expired records; returns the number of keys deleted.
///
/// Never fails: a listing error aborts the sweep quietly, and a failed
/// deletion is logged and skipped.
pub async fn sweep(store: &dyn KvStore, today: NaiveDate) -> usize {
    let keys = match store.list_keys().await {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!(error = %e, "cleanup sweep could not list keys");
            return 0;
        }
    };

    let cutoff = today - Duration::days(RETENTION_DAYS);
    let expired: Vec<String> = keys
        .into_iter()
        .filter(|key| extract_date(key).is_some_and(|date| date < cutoff))
        .collect();

    if expired.is_empty() {
        return 0;
    }

    tracing::info!(count = expired.len(), cutoff = %cutoff, "removing expired records");

    let results = join_all(expired.iter().map(|key| store.remove(key))).await;

    let mut removed = 0;
    for (key, result) in expired.iter().zip(results) {
        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(key = %key, error = %e, "failed to remove expired record"),
        }
    }

    removed
}
