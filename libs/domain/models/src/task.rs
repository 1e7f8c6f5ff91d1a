// [libs/domain/models/src/task.rs]
//! A task is one execution attempt of a bot: the unit the scheduler
//! creates, the worker executes, and the reporter finalizes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::Status;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub bot_id: i64,
    pub proxy_id: Option<i64>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(bot_id: i64, proxy_id: Option<i64>, now: DateTime<Utc>) -> Self {
        Task {
            id: 0,
            bot_id,
            proxy_id,
            status: Status::InProgress,
            created_at: now,
            finished_at: None,
        }
    }

    /// The path of the per-task log file the worker writes execution
    /// output to, rooted under the configured log directory.
    pub fn log_path(&self, log_dir: &std::path::Path) -> std::path::PathBuf {
        log_dir.join(format!("{}.log", self.id))
    }
}
