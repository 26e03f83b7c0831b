//! One attendance run: engine, cleanup sweep, digest dispatch
//!
//! This is the entry point the external scheduler triggers. All collaborators
//! are constructed here and live exactly as long as the run.

use anyhow::{Context, Result};

use crate::attendance::{cleanup, AttendanceEngine, RunLog};
use crate::config::Config;
use crate::notify::{Notifier, DIGEST_TITLE};
use crate::skland::{AttendanceService, SklandClient};
use crate::store::keys::today_shanghai;
use crate::store::{KvStore, RedisStore};

/// Execute one full attendance run against the production service.
pub async fn run() -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    config.validate()?;

    let store = RedisStore::new(&config.storage).context("connecting to storage")?;
    let service = SklandClient::new().context("building service client")?;
    let notifier = Notifier::from_config(&config.notify);

    run_with(&service, &store, &notifier, &config).await;
    Ok(())
}

/// Run the engine, the cleanup sweep and the notification dispatch over the
/// given collaborators. Never fails; every failure ends up in the digest.
pub async fn run_with(
    service: &dyn AttendanceService,
    store: &dyn KvStore,
    notifier: &Notifier,
    config: &Config,
) {
    let today = today_shanghai();
    let mut log = RunLog::new();

    tracing::info!(
        accounts = config.accounts.len(),
        date = %today,
        "starting attendance run"
    );

    let engine = AttendanceEngine::new(service, store, &config.engine, today);
    let total = engine.run(&config.accounts, &mut log).await;

    let removed = cleanup::sweep(store, today).await;
    if removed > 0 {
        log.log(format!("清理了 {removed} 条过期记录"));
    }

    log.log(format!("### 签到汇总\n总共成功签到 {total} 个角色"));

    if notifier.is_empty() {
        tracing::info!("no notification channels configured, skipping dispatch");
    } else {
        notifier.dispatch(DIGEST_TITLE, &log.content()).await;
    }

    tracing::info!(
        total_success = total,
        has_error = log.has_error(),
        "attendance run complete"
    );
}
