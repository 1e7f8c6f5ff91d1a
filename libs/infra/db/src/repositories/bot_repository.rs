// [libs/infra/db/src/repositories/bot_repository.rs]
//! Bot lookups and the status-bearing writes the scheduler, reporter and
//! failure handler perform. Every function that changes `status` folds
//! the owning tracker's recompute into the same transaction it runs in.

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row, Transaction};
use mtracker_domain_models::{Bot, BotRunUpdate, Status};
use std::collections::HashSet;
use std::str::FromStr;

use crate::errors::DbError;
use crate::repositories::tracker_repository;

const SELECT_COLUMNS: &str =
    "bot_id, tracker_id, country, status, state, failing_spree, last_error, next_execution FROM bots";

fn map_row(row: &Row) -> Result<Bot, DbError> {
    let status_text: String = row.get(3).map_err(DbError::QueryError)?;
    let state_text: String = row.get(4).map_err(DbError::QueryError)?;
    let next_execution_text: String = row.get(7).map_err(DbError::QueryError)?;

    Ok(Bot {
        id: row.get(0).map_err(DbError::QueryError)?,
        tracker_id: row.get(1).map_err(DbError::QueryError)?,
        country: row.get(2).map_err(DbError::QueryError)?,
        status: Status::from_str(&status_text).map_err(|e| DbError::MappingError(e.to_string()))?,
        state: serde_json::from_str(&state_text).map_err(|e| DbError::MappingError(format!("bot.state: {e}")))?,
        failing_spree: row.get(5).map_err(DbError::QueryError)?,
        last_error: row.get(6).map_err(DbError::QueryError)?,
        next_execution: DateTime::parse_from_rfc3339(&next_execution_text)
            .map_err(|e| DbError::MappingError(format!("bot.next_execution: {e}")))?
            .with_timezone(&Utc),
    })
}

pub async fn get(connection: &Connection, bot_id: i64) -> Result<Option<Bot>, DbError> {
    let mut rows = connection
        .query(&format!("SELECT {SELECT_COLUMNS} WHERE bot_id = ?1"), params![bot_id])
        .await
        .map_err(DbError::QueryError)?;
    match rows.next().await.map_err(DbError::QueryError)? {
        Some(row) => Ok(Some(map_row(&row)?)),
        None => Ok(None),
    }
}

pub async fn list_by_tracker(connection: &Connection, tracker_id: i64) -> Result<Vec<Bot>, DbError> {
    let mut rows = connection
        .query(
            &format!("SELECT {SELECT_COLUMNS} WHERE tracker_id = ?1 ORDER BY bot_id DESC"),
            params![tracker_id],
        )
        .await
        .map_err(DbError::QueryError)?;
    let mut bots = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        bots.push(map_row(&row)?);
    }
    Ok(bots)
}

pub async fn countries_for_tracker(connection: &Connection, tracker_id: i64) -> Result<HashSet<String>, DbError> {
    let mut rows = connection
        .query("SELECT country FROM bots WHERE tracker_id = ?1", params![tracker_id])
        .await
        .map_err(DbError::QueryError)?;
    let mut countries = HashSet::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        countries.insert(row.get(0).map_err(DbError::QueryError)?);
    }
    Ok(countries)
}

/// Bots due for a run: `next_execution <= before`, schedulable status,
/// oldest due first.
pub async fn fetch_pending(connection: &Connection, before: DateTime<Utc>) -> Result<Vec<Bot>, DbError> {
    let mut rows = connection
        .query(
            &format!(
                "SELECT {SELECT_COLUMNS} WHERE next_execution <= ?1 \
                 AND status IN ('working', 'failing', 'new') \
                 ORDER BY next_execution ASC"
            ),
            params![before.to_rfc3339()],
        )
        .await
        .map_err(DbError::QueryError)?;
    let mut bots = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        bots.push(map_row(&row)?);
    }
    Ok(bots)
}

/// Creates a bot for a newly observed (tracker, country) pair, in `NEW`
/// status with `next_execution = now`. Must run inside the ingest
/// transaction alongside the tracker lookup/create.
pub async fn create(
    transaction: &Transaction,
    tracker_id: i64,
    country: &str,
    now: DateTime<Utc>,
) -> Result<Bot, DbError> {
    let mut rows = transaction
        .query(
            "INSERT INTO bots (tracker_id, country, status, state, failing_spree, last_error, next_execution)
             VALUES (?1, ?2, ?3, '{}', 0, '', ?4)
             RETURNING bot_id",
            params![tracker_id, country, Status::New.as_db_str(), now.to_rfc3339()],
        )
        .await
        .map_err(DbError::QueryError)?;

    let row = rows
        .next()
        .await
        .map_err(DbError::QueryError)?
        .ok_or_else(|| DbError::MappingError("bot insert returned no row".into()))?;

    let mut bot = Bot::new(tracker_id, country.to_string(), now);
    bot.id = row.get(0).map_err(DbError::QueryError)?;
    Ok(bot)
}

/// Pins a bot to `INPROGRESS`. Called in the same transaction that
/// creates its task (spec 4.D: bot-row serialization of concurrent task
/// creation).
pub async fn set_inprogress(transaction: &Transaction, bot_id: i64) -> Result<(), DbError> {
    transaction
        .execute(
            "UPDATE bots SET status = ?1 WHERE bot_id = ?2",
            params![Status::InProgress.as_db_str(), bot_id],
        )
        .await
        .map_err(DbError::QueryError)?;
    Ok(())
}

/// Scheduler's no-matching-proxy path: `FAILING`, fixed error message,
/// `next_execution += 24h`, state untouched.
pub async fn mark_failing_no_proxy(
    transaction: &Transaction,
    bot_id: i64,
    tracker_id: i64,
    now: DateTime<Utc>,
) -> Result<Status, DbError> {
    let next_execution = now + chrono::Duration::hours(24);
    transaction
        .execute(
            "UPDATE bots SET status = ?1, last_error = ?2, next_execution = ?3 WHERE bot_id = ?4",
            params![
                Status::Failing.as_db_str(),
                "No matching proxy found",
                next_execution.to_rfc3339(),
                bot_id
            ],
        )
        .await
        .map_err(DbError::QueryError)?;
    tracker_repository::recompute_status(transaction, tracker_id).await
}

/// Applies the reporter's `Bot.update_after_run` dispatch table. `state`
/// is written only when `update.state` is `Some` (COALESCE semantics).
pub async fn update_after_run(
    transaction: &Transaction,
    bot_id: i64,
    tracker_id: i64,
    update: &BotRunUpdate,
) -> Result<Status, DbError> {
    match &update.state {
        Some(state) => {
            let state_text = serde_json::to_string(state)
                .map_err(|e| DbError::MappingError(format!("bot.state serialize: {e}")))?;
            transaction
                .execute(
                    "UPDATE bots SET status = ?1, state = ?2, failing_spree = ?3, last_error = ?4, next_execution = ?5 \
                     WHERE bot_id = ?6",
                    params![
                        update.status.as_db_str(),
                        state_text,
                        update.failing_spree,
                        update.last_error.as_str(),
                        update.next_execution.to_rfc3339(),
                        bot_id
                    ],
                )
                .await
                .map_err(DbError::QueryError)?;
        }
        None => {
            transaction
                .execute(
                    "UPDATE bots SET status = ?1, failing_spree = ?2, last_error = ?3, next_execution = ?4 \
                     WHERE bot_id = ?5",
                    params![
                        update.status.as_db_str(),
                        update.failing_spree,
                        update.last_error.as_str(),
                        update.next_execution.to_rfc3339(),
                        bot_id
                    ],
                )
                .await
                .map_err(DbError::QueryError)?;
        }
    }
    tracker_repository::recompute_status(transaction, tracker_id).await
}

/// Failure handler's bot write: `CRASHED`, short exception text,
/// `failing_spree`/`state`/`next_execution` untouched.
pub async fn mark_crashed(
    transaction: &Transaction,
    bot_id: i64,
    tracker_id: i64,
    last_error: &str,
) -> Result<Status, DbError> {
    transaction
        .execute(
            "UPDATE bots SET status = ?1, last_error = ?2 WHERE bot_id = ?3",
            params![Status::Crashed.as_db_str(), last_error, bot_id],
        )
        .await
        .map_err(DbError::QueryError)?;
    tracker_repository::recompute_status(transaction, tracker_id).await
}
