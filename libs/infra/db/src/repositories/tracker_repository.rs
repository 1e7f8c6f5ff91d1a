// [libs/infra/db/src/repositories/tracker_repository.rs]
//! Tracker lookups, creation, and the status-recompute step every bot
//! write must fold into its own transaction (spec invariant I1).

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row, Transaction};
use mtracker_domain_models::{Status, Tracker};
use serde_json::Value;
use std::str::FromStr;

use crate::errors::DbError;

fn map_row(row: &Row) -> Result<Tracker, DbError> {
    let config_text: String = row.get(2).map_err(DbError::QueryError)?;
    let status_text: String = row.get(4).map_err(DbError::QueryError)?;
    let created_at_text: String = row.get(5).map_err(DbError::QueryError)?;

    Ok(Tracker {
        id: row.get(0).map_err(DbError::QueryError)?,
        family: row.get(1).map_err(DbError::QueryError)?,
        config: serde_json::from_str(&config_text)
            .map_err(|e| DbError::MappingError(format!("tracker.config: {e}")))?,
        config_hash: row.get(3).map_err(DbError::QueryError)?,
        status: Status::from_str(&status_text).map_err(|e| DbError::MappingError(e.to_string()))?,
        created_at: DateTime::parse_from_rfc3339(&created_at_text)
            .map_err(|e| DbError::MappingError(format!("tracker.created_at: {e}")))?
            .with_timezone(&Utc),
    })
}

const SELECT_COLUMNS: &str =
    "tracker_id, family, config, config_hash, status, created_at FROM trackers";

pub async fn get_by_hash(connection: &Connection, config_hash: &str) -> Result<Option<Tracker>, DbError> {
    let mut rows = connection
        .query(&format!("SELECT {SELECT_COLUMNS} WHERE config_hash = ?1"), params![config_hash])
        .await
        .map_err(DbError::QueryError)?;
    match rows.next().await.map_err(DbError::QueryError)? {
        Some(row) => Ok(Some(map_row(&row)?)),
        None => Ok(None),
    }
}

pub async fn get(connection: &Connection, tracker_id: i64) -> Result<Option<Tracker>, DbError> {
    let mut rows = connection
        .query(&format!("SELECT {SELECT_COLUMNS} WHERE tracker_id = ?1"), params![tracker_id])
        .await
        .map_err(DbError::QueryError)?;
    match rows.next().await.map_err(DbError::QueryError)? {
        Some(row) => Ok(Some(map_row(&row)?)),
        None => Ok(None),
    }
}

/// Creates a new tracker in `NEW` status. Callers are expected to have
/// already checked `get_by_hash` inside the same transaction — ingest is
/// idempotent on `config_hash` by virtue of the column's UNIQUE index,
/// not by this function re-checking it.
pub async fn create(
    transaction: &Transaction,
    family: &str,
    config: &Value,
    config_hash: &str,
    now: DateTime<Utc>,
) -> Result<Tracker, DbError> {
    let config_text = serde_json::to_string(config)
        .map_err(|e| DbError::MappingError(format!("tracker.config serialize: {e}")))?;

    let mut rows = transaction
        .query(
            "INSERT INTO trackers (family, config, config_hash, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING tracker_id",
            params![family, config_text, config_hash, Status::New.as_db_str(), now.to_rfc3339()],
        )
        .await
        .map_err(DbError::QueryError)?;

    let row = rows
        .next()
        .await
        .map_err(DbError::QueryError)?
        .ok_or_else(|| DbError::MappingError("tracker insert returned no row".into()))?;
    let tracker_id: i64 = row.get(0).map_err(DbError::QueryError)?;

    Ok(Tracker {
        id: tracker_id,
        family: family.to_string(),
        config: config.clone(),
        config_hash: config_hash.to_string(),
        status: Status::New,
        created_at: now,
    })
}

/// Recomputes `tracker_id`'s aggregate status from its bots' current
/// statuses and writes it. Must run inside the same transaction as the
/// bot write that triggered it.
pub async fn recompute_status(transaction: &Transaction, tracker_id: i64) -> Result<Status, DbError> {
    let mut rows = transaction
        .query("SELECT status FROM bots WHERE tracker_id = ?1", params![tracker_id])
        .await
        .map_err(DbError::QueryError)?;

    let mut statuses = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        let status_text: String = row.get(0).map_err(DbError::QueryError)?;
        statuses.push(Status::from_str(&status_text).map_err(|e| DbError::MappingError(e.to_string()))?);
    }

    let aggregate = Tracker::aggregate_status(&statuses);

    transaction
        .execute(
            "UPDATE trackers SET status = ?1 WHERE tracker_id = ?2",
            params![aggregate.as_db_str(), tracker_id],
        )
        .await
        .map_err(DbError::QueryError)?;

    Ok(aggregate)
}
