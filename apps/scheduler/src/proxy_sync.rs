// [apps/scheduler/src/proxy_sync.rs]
//! Background daemon that periodically reconciles the stored proxy pool
//! against the configured external source (spec 4.C). Runs independently
//! of the tick loop and the reaper — a stale or unreachable proxy source
//! degrades proxy selection, it never blocks scheduling.

use std::time::Duration;

use mtracker_infra_db::{DbError, TursoClient};
use mtracker_infra_proxy_source::fetch_proxy_pool;
use mtracker_shared_config::ProxySection;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ProxySyncError {
    #[error("proxy source error: {0}")]
    Source(#[from] mtracker_infra_proxy_source::ProxySourceError),
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

/// Spawns the proxy-sync loop, ticking every `interval_secs`. A failed
/// fetch or sync is logged and retried on the next tick rather than
/// crashing the process.
pub async fn spawn_proxy_sync(database: TursoClient, proxy: ProxySection, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    tokio::spawn(async move {
        info!("proxy sync daemon started");
        loop {
            ticker.tick().await;
            match sync_once(&database, &proxy).await {
                Ok(diff) if !diff.added.is_empty() || !diff.deleted.is_empty() => {
                    info!(added = diff.added.len(), deleted = diff.deleted.len(), "proxy pool synchronized");
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "proxy pool sync failed"),
            }
        }
    });
}

async fn sync_once(database: &TursoClient, proxy: &ProxySection) -> Result<mtracker_domain_models::ProxyDiff, ProxySyncError> {
    let fetched = fetch_proxy_pool(proxy).await?;
    let connection = database.get_connection()?;
    let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
    let diff = mtracker_infra_db::repositories::proxy_repository::synchronize(&transaction, &fetched).await?;
    transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
    Ok(diff)
}
