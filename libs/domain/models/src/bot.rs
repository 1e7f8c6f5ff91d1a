// [libs/domain/models/src/bot.rs]
//! A bot is one tracker, impersonated from one country. It carries the
//! saved state a module threads across runs (cookies, session tokens,
//! sequence counters) and the scheduling bookkeeping that decides when it
//! runs next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::Status;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub id: i64,
    pub tracker_id: i64,
    pub country: String,
    pub status: Status,
    pub state: Value,
    pub failing_spree: i32,
    pub last_error: String,
    pub next_execution: DateTime<Utc>,
}

/// Outcome handed back from a finished task, used to decide how a bot's
/// scheduling bookkeeping should be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Worked,
    Failed,
    Archived,
    Crashed,
}

/// The bookkeeping fields `update_after_run` is allowed to change. `state`
/// is `None` when a run produced no new saved state (e.g. it crashed) and
/// the previous state must be preserved — this mirrors the `COALESCE`
/// semantics of the underlying update statement.
#[derive(Debug, Clone)]
pub struct BotRunUpdate {
    pub status: Status,
    pub state: Option<Value>,
    pub failing_spree: i32,
    pub last_error: String,
    pub next_execution: DateTime<Utc>,
}

impl Bot {
    pub fn new(tracker_id: i64, country: String, now: DateTime<Utc>) -> Self {
        Bot {
            id: 0,
            tracker_id,
            country,
            status: Status::New,
            state: Value::Object(Default::default()),
            failing_spree: 0,
            last_error: String::new(),
            next_execution: now,
        }
    }

    /// Computes the next bookkeeping state for this bot after a task
    /// finishes, given the outcome, any freshly saved state, and the
    /// tracker-wide failing-spree threshold. This is a pure function over
    /// `self` — the repository layer is responsible for persisting it and
    /// for recomputing the owning tracker's aggregate status afterwards.
    ///
    /// `failure_message` is the text stored as `last_error` on a
    /// `Failed` outcome (spec 4.G: "store `last_error`"); it is ignored
    /// for every other outcome.
    pub fn plan_run_update(
        &self,
        outcome: RunOutcome,
        new_state: Option<Value>,
        failure_message: &str,
        now: DateTime<Utc>,
        task_period: chrono::Duration,
        max_failing_spree: i32,
    ) -> BotRunUpdate {
        match outcome {
            RunOutcome::Crashed => BotRunUpdate {
                status: Status::Crashed,
                state: None,
                failing_spree: self.failing_spree,
                last_error: self.last_error.clone(),
                next_execution: self.next_execution,
            },
            RunOutcome::Worked => BotRunUpdate {
                status: Status::Working,
                state: new_state,
                failing_spree: 0,
                last_error: String::new(),
                next_execution: now + task_period,
            },
            RunOutcome::Archived => BotRunUpdate {
                status: Status::Archived,
                state: new_state,
                failing_spree: 0,
                last_error: String::new(),
                next_execution: now + task_period,
            },
            RunOutcome::Failed => {
                let spree = self.failing_spree + 1;
                let status = if spree > max_failing_spree {
                    Status::Archived
                } else {
                    Status::Failing
                };
                BotRunUpdate {
                    status,
                    state: new_state,
                    failing_spree: spree,
                    last_error: failure_message.to_string(),
                    next_execution: now + task_period,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bot_with_spree(spree: i32) -> Bot {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut b = Bot::new(1, "pl".into(), now);
        b.failing_spree = spree;
        b
    }

    #[test]
    fn crashed_run_preserves_previous_state_and_spree() {
        let bot = bot_with_spree(2);
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let update = bot.plan_run_update(RunOutcome::Crashed, None, "", now, chrono::Duration::hours(12), 5);
        assert_eq!(update.status, Status::Crashed);
        assert!(update.state.is_none());
        assert_eq!(update.failing_spree, 2);
        assert_eq!(update.next_execution, bot.next_execution);
    }

    #[test]
    fn successful_run_clears_spree_and_schedules_next_period() {
        let bot = bot_with_spree(3);
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let period = chrono::Duration::hours(12);
        let update = bot.plan_run_update(RunOutcome::Worked, Some(Value::Null), "", now, period, 5);
        assert_eq!(update.status, Status::Working);
        assert_eq!(update.failing_spree, 0);
        assert_eq!(update.next_execution, now + period);
    }

    #[test]
    fn failed_run_below_threshold_stays_failing() {
        let bot = bot_with_spree(1);
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let update =
            bot.plan_run_update(RunOutcome::Failed, None, "no working C2 found", now, chrono::Duration::hours(12), 5);
        assert_eq!(update.status, Status::Failing);
        assert_eq!(update.failing_spree, 2);
        assert_eq!(update.last_error, "no working C2 found");
    }

    #[test]
    fn failed_run_past_threshold_archives() {
        let bot = bot_with_spree(5);
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let update = bot.plan_run_update(RunOutcome::Failed, None, "still failing", now, chrono::Duration::hours(12), 5);
        assert_eq!(update.status, Status::Archived);
        assert_eq!(update.failing_spree, 6);
    }

    #[test]
    fn archived_run_clears_spree_and_last_error() {
        let mut bot = bot_with_spree(4);
        bot.last_error = "previous failure".into();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let update =
            bot.plan_run_update(RunOutcome::Archived, Some(Value::Null), "", now, chrono::Duration::hours(12), 5);
        assert_eq!(update.status, Status::Archived);
        assert_eq!(update.failing_spree, 0);
        assert_eq!(update.last_error, "");
    }
}
