// [apps/worker/src/failure_handler.rs]
//! Runs when the job loop's own guard catches a genuine crash or
//! timeout around an execute job (spec 4.H) — never for a module that
//! returned a normal `(status, ...)` triple, however bad that status
//! is. Appends the failure to the task's log file, then marks the
//! task and its bot `CRASHED`, recomputing the owning tracker in the
//! same transaction.

use std::path::Path;

use chrono::Utc;
use mtracker_domain_models::Status;
use mtracker_infra_db::repositories::{bot_repository, task_repository};
use mtracker_infra_db::{DbError, TursoClient};
use tracing::error;

use crate::log;

/// Records a hard failure for `task_id`/`bot_id`: appends `trace` to
/// the task's log file, then writes `CRASHED` to both rows.
pub async fn handle_crash(
    database: &TursoClient,
    log_dir: &Path,
    task_id: i64,
    bot_id: i64,
    tracker_id: i64,
    trace: &str,
) -> Result<(), DbError> {
    let path = log_dir.join(format!("{task_id}.log"));
    if let Err(e) = log::append_line(&path, &format!("CRASH: {trace}")) {
        error!(task_id, error = %e, "failed to append crash trace to task log");
    }

    let connection = database.get_connection()?;
    let now = Utc::now();

    let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
    task_repository::update_after_run(&transaction, task_id, Status::Crashed, now).await?;
    bot_repository::mark_crashed(&transaction, bot_id, tracker_id, short_exception_text(trace)).await?;
    transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

    Ok(())
}

/// The bot row stores a short exception line, not the full trace — the
/// trace itself lives in the task's log file.
fn short_exception_text(trace: &str) -> &str {
    trace.lines().next().unwrap_or(trace)
}
