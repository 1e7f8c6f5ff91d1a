// [libs/infra/db/src/repositories/result_repository.rs]
//! Persists one row per artifact the reporter uploaded to the artifact
//! store, referencing it by sha256.

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row, Transaction};
use mtracker_domain_models::{ResultKind, ResultRecord};
use mtracker_domain_result_tree::UploadedArtifact;

use crate::errors::DbError;

const SELECT_COLUMNS: &str = "result_id, task_id, result_type, name, sha256, tags, upload_time FROM results";

fn kind_from_str(kind: &str) -> Result<ResultKind, DbError> {
    match kind {
        "generic" => Ok(ResultKind::Generic),
        "config" => Ok(ResultKind::Config),
        "binary" => Ok(ResultKind::Binary),
        "blob" => Ok(ResultKind::Blob),
        other => Err(DbError::MappingError(format!("unrecognized result_type: {other}"))),
    }
}

fn kind_as_str(kind: ResultKind) -> &'static str {
    match kind {
        ResultKind::Generic => "generic",
        ResultKind::Config => "config",
        ResultKind::Binary => "binary",
        ResultKind::Blob => "blob",
    }
}

fn map_row(row: &Row) -> Result<ResultRecord, DbError> {
    let kind_text: String = row.get(2).map_err(DbError::QueryError)?;
    let tags_text: String = row.get(5).map_err(DbError::QueryError)?;
    let upload_time_text: String = row.get(6).map_err(DbError::QueryError)?;

    Ok(ResultRecord {
        id: row.get(0).map_err(DbError::QueryError)?,
        task_id: row.get(1).map_err(DbError::QueryError)?,
        kind: kind_from_str(&kind_text)?,
        name: row.get(3).map_err(DbError::QueryError)?,
        sha256: row.get(4).map_err(DbError::QueryError)?,
        tags: serde_json::from_str(&tags_text).map_err(|e| DbError::MappingError(format!("result.tags: {e}")))?,
        created_at: DateTime::parse_from_rfc3339(&upload_time_text)
            .map_err(|e| DbError::MappingError(format!("result.upload_time: {e}")))?
            .with_timezone(&Utc),
    })
}

/// Records one uploaded artifact against the task it belongs to. Called
/// once per entry returned by `mtracker_domain_result_tree::report_tree`.
pub async fn record(
    transaction: &Transaction,
    task_id: i64,
    artifact: &UploadedArtifact,
    now: DateTime<Utc>,
) -> Result<ResultRecord, DbError> {
    let kind = match artifact.kind {
        "config" => ResultKind::Config,
        "binary" => ResultKind::Binary,
        "blob" => ResultKind::Blob,
        other => return Err(DbError::MappingError(format!("unrecognized artifact kind: {other}"))),
    };
    let tags_text = serde_json::to_string(&artifact.tags)
        .map_err(|e| DbError::MappingError(format!("result.tags serialize: {e}")))?;

    let mut rows = transaction
        .query(
            "INSERT INTO results (task_id, result_type, name, sha256, tags, upload_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING result_id",
            params![task_id, kind_as_str(kind), artifact.name.as_str(), artifact.sha256.as_str(), tags_text, now.to_rfc3339()],
        )
        .await
        .map_err(DbError::QueryError)?;

    let row = rows
        .next()
        .await
        .map_err(DbError::QueryError)?
        .ok_or_else(|| DbError::MappingError("result insert returned no row".into()))?;

    Ok(ResultRecord {
        id: row.get(0).map_err(DbError::QueryError)?,
        task_id,
        kind,
        name: artifact.name.clone(),
        sha256: artifact.sha256.clone(),
        tags: artifact.tags.clone(),
        created_at: now,
    })
}

pub async fn list_by_task(connection: &Connection, task_id: i64) -> Result<Vec<ResultRecord>, DbError> {
    let mut rows = connection
        .query(
            &format!("SELECT {SELECT_COLUMNS} WHERE task_id = ?1 ORDER BY result_id DESC"),
            params![task_id],
        )
        .await
        .map_err(DbError::QueryError)?;
    let mut results = Vec::new();
    while let Some(row) = rows.next().await.map_err(DbError::QueryError)? {
        results.push(map_row(&row)?);
    }
    Ok(results)
}
