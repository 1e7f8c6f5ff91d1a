// [libs/domain/models/src/tracker.rs]
//! A tracker is one unique static configuration for a malware family —
//! the thing being watched. Its status is always the minimum status of
//! its bots, recomputed whenever a bot's status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::Status;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker {
    pub id: i64,
    pub family: String,
    pub config: Value,
    pub config_hash: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

impl Tracker {
    /// Recomputes aggregate status from the statuses of its bots. An empty
    /// bot set is `New` — a tracker with nothing scheduled yet is neither
    /// working nor broken.
    pub fn aggregate_status<'a>(bot_statuses: impl IntoIterator<Item = &'a Status>) -> Status {
        bot_statuses.into_iter().min().copied().unwrap_or(Status::New)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_status_is_the_minimum_rank() {
        let statuses = [Status::Working, Status::Crashed, Status::New];
        assert_eq!(Tracker::aggregate_status(&statuses), Status::Crashed);
    }

    #[test]
    fn aggregate_status_of_no_bots_is_new() {
        let statuses: Vec<Status> = vec![];
        assert_eq!(Tracker::aggregate_status(&statuses), Status::New);
    }
}
