// [libs/infra/db/src/repositories/task_repository.rs]
//! Task lifecycle: created `INPROGRESS` by the scheduler, finalized by
//! the reporter or the failure handler, swept by the reaper backstop.

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row, Transaction};
use mtracker_domain_models::{Status, Task};
use std::str::FromStr;

use crate::errors::DbError;

const SELECT_COLUMNS: &str = "task_id, bot_id, proxy_id, status, created_at, finished_at FROM tasks";

fn map_row(row: &Row) -> Result<Task, DbError> {
    let status_text: String = row.get(3).map_err(DbError::QueryError)?;
    let created_at_text: String = row.get(4).map_err(DbError::QueryError)?;
    let finished_at_text: Option<String> = row.get(5).map_err(DbError::QueryError)?;

    Ok(Task {
        id: row.get(0).map_err(DbError::QueryError)?,
        bot_id: row.get(1).map_err(DbError::QueryError)?,
        proxy_id: row.get(2).map_err(DbError::QueryError)?,
        status: Status::from_str(&status_text).map_err(|e| DbError::MappingError(e.to_string()))?,
        created_at: DateTime::parse_from_rfc3339(&created_at_text)
            .map_err(|e| DbError::MappingError(format!("task.created_at: {e}")))?
            .with_timezone(&Utc),
        finished_at: finished_at_text
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DbError::MappingError(format!("task.finished_at: {e}")))
            })
            .transpose()?,
    })
}

pub async fn get(connection: &Connection, task_id: i64) -> Result<Option<Task>, DbError> {
    let mut rows = connection
        .query(&format!("SELECT {SELECT_COLUMNS} WHERE task_id = ?1"), params![task_id])
        .await
        .map_err(DbError::QueryError)?;
    match rows.next().await.map_err(DbError::QueryError)? {
        Some(row) => Ok(Some(map_row(&row)?)),
        None => Ok(None),
    }
}

/// Creates a task in `INPROGRESS`. Must run in the same transaction as
/// `bot_repository::set_inprogress` (spec 4.D serialization rule).
pub async fn create(
    transaction: &Transaction,
    bot_id: i64,
    proxy_id: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Task, DbError> {
    let mut rows = transaction
        .query(
            "INSERT INTO tasks (bot_id, proxy_id, status, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING task_id",
            params![bot_id, proxy_id, Status::InProgress.as_db_str(), now.to_rfc3339()],
        )
        .await
        .map_err(DbError::QueryError)?;

    let row = rows
        .next()
        .await
        .map_err(DbError::QueryError)?
        .ok_or_else(|| DbError::MappingError("task insert returned no row".into()))?;

    Ok(Task {
        id: row.get(0).map_err(DbError::QueryError)?,
        bot_id,
        proxy_id,
        status: Status::InProgress,
        created_at: now,
        finished_at: None,
    })
}

/// Finalizes a task to a terminal status (reporter or failure handler).
pub async fn update_after_run(
    transaction: &Transaction,
    task_id: i64,
    status: Status,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    transaction
        .execute(
            "UPDATE tasks SET status = ?1, finished_at = ?2 WHERE task_id = ?3",
            params![status.as_db_str(), now.to_rfc3339(), task_id],
        )
        .await
        .map_err(DbError::QueryError)?;
    Ok(())
}

/// Tasks stuck `INPROGRESS` past `older_than` — the reaper's candidate
/// set. Returns `(task_id, bot_id)` pairs so the caller can crash both
/// rows without a second round trip per task.
pub async fn sweep_timed_out(
    connection: &Connection,
    older_than: DateTime<Utc>,
) -> Result<Vec<(i64, i64)>, DbError> {
    let mut rows = connection
        .query(
            "SELECT task_id, bot_id FROM tasks WHERE status = ?1 AND created_at < ?2",
            params![Status::InProgress.as_db_str(), older_than.to_rfc3339()],
        )
        .await
        .map_err(DbError::QueryError)?;

    let mut stuck = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        stuck.push((row.get(0).map_err(DbError::QueryError)?, row.get(1).map_err(DbError::QueryError)?));
    }
    Ok(stuck)
}
