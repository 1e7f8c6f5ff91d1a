// [apps/scheduler/src/reaper.rs]
//! Background hygiene daemon: periodically sweeps tasks stuck
//! `INPROGRESS` past `task_timeout` and crashes the task and its bot.
//! This is a backstop against a worker that died mid-job without ever
//! calling `complete_execute` — the broker's own timeout guard handles
//! the ordinary case; this catches the rest.

use std::time::Duration;

use chrono::Utc;
use mtracker_infra_db::repositories::{bot_repository, task_repository};
use mtracker_infra_db::{DbError, TursoClient};
use tracing::{error, info, warn};

const STUCK_TASK_ERROR: &str = "task_timeout_exceeded";

/// Spawns the reaper loop, ticking every `interval_secs`. Runs until
/// the process exits; errors within a sweep are logged and the loop
/// continues on its next tick rather than dying.
pub async fn spawn_reaper(database: TursoClient, task_timeout_secs: u64, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    tokio::spawn(async move {
        info!("reaper daemon started");
        loop {
            ticker.tick().await;
            if let Err(e) = sweep(&database, task_timeout_secs).await {
                error!(error = %e, "reaper sweep failed");
            }
        }
    });
}

async fn sweep(database: &TursoClient, task_timeout_secs: u64) -> Result<(), DbError> {
    let connection = database.get_connection()?;
    let older_than = Utc::now() - chrono::Duration::seconds(task_timeout_secs as i64);

    let stuck = task_repository::sweep_timed_out(&connection, older_than).await?;
    if stuck.is_empty() {
        return Ok(());
    }

    warn!(count = stuck.len(), "sweeping tasks stuck past their timeout");
    for (task_id, bot_id) in stuck {
        let now = Utc::now();
        let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

        task_repository::update_after_run(&transaction, task_id, mtracker_domain_models::Status::Crashed, now)
            .await?;

        let bot = match bot_repository::get(&connection, bot_id).await? {
            Some(bot) => bot,
            None => {
                transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
                continue;
            }
        };
        bot_repository::mark_crashed(&transaction, bot_id, bot.tracker_id, STUCK_TASK_ERROR).await?;
        transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

        info!(task_id, bot_id, "reaped stuck task");
    }
    Ok(())
}
