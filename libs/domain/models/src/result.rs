// [libs/domain/models/src/result.rs]
//! A single artifact row attached to a finished task, recorded once the
//! result tree it came from has been uploaded to the artifact store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Generic,
    Config,
    Binary,
    Blob,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: i64,
    pub task_id: i64,
    pub kind: ResultKind,
    pub name: String,
    pub tags: Vec<String>,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}
