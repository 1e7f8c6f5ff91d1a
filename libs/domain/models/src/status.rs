// [libs/domain/models/src/status.rs]
//! Generic status codes shared by trackers, bots and tasks.
//!
//! Values are chosen so that a parent's status can always be computed as
//! `min(children.status)` — see `Tracker::recompute_from_bots` in
//! `mtracker-infra-db`, which relies on this ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Crashed,
    InProgress,
    Working,
    Failing,
    New,
    Archived,
}

impl Status {
    /// Numeric rank used for `min()` aggregation and ordering, matching
    /// the source `IntEnum` values exactly.
    const fn rank(self) -> u8 {
        match self {
            Status::Crashed => 0,
            Status::InProgress => 1,
            Status::Working => 2,
            Status::Failing => 3,
            Status::New => 4,
            Status::Archived => 5,
        }
    }

    pub const fn as_db_str(self) -> &'static str {
        match self {
            Status::Crashed => "crashed",
            Status::InProgress => "inprogress",
            Status::Working => "working",
            Status::Failing => "failing",
            Status::New => "new",
            Status::Archived => "archived",
        }
    }

    /// Statuses eligible for `fetch_pending` — bots the scheduler should
    /// still consider for a run.
    pub const fn is_schedulable(self) -> bool {
        matches!(self, Status::Working | Status::Failing | Status::New)
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Status::InProgress)
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized status string: {0}")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crashed" => Ok(Status::Crashed),
            "inprogress" => Ok(Status::InProgress),
            "working" => Ok(Status::Working),
            "failing" => Ok(Status::Failing),
            "new" => Ok(Status::New),
            "archived" => Ok(Status::Archived),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_source_int_enum() {
        assert!(Status::Crashed < Status::InProgress);
        assert!(Status::InProgress < Status::Working);
        assert!(Status::Working < Status::Failing);
        assert!(Status::Failing < Status::New);
        assert!(Status::New < Status::Archived);
    }

    #[test]
    fn min_of_mixed_set_is_the_lowest_rank() {
        let statuses = [Status::Working, Status::New, Status::Crashed, Status::Failing];
        assert_eq!(statuses.iter().min().copied(), Some(Status::Crashed));
    }

    #[test]
    fn round_trips_through_db_string() {
        for s in [
            Status::Crashed,
            Status::InProgress,
            Status::Working,
            Status::Failing,
            Status::New,
            Status::Archived,
        ] {
            assert_eq!(Status::from_str(s.as_db_str()).unwrap(), s);
        }
    }
}
