// [libs/infra/broker/src/contract.rs]
//! The `track`/`report` queue pair and the `JobBroker` trait every
//! backend implements.
//!
//! The defining constraint (spec 4.E/4.G/§5) is that a report job runs
//! *after the execute job completes*, whatever that completion looks
//! like — success, an uncaught exception, or a timeout — never only on
//! success. This crate models that as two independent queues plus an
//! outcome slot keyed by `task_id`: the worker drains `track`, and once
//! it (or the failure handler, or a timeout wrapper) calls
//! `complete_execute`, the matching report job becomes dequeuable from
//! `report`. A report job is never enqueued without an outcome already
//! recorded for it, so `dequeue_report` can never observe a pending
//! execute.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::errors::BrokerError;

/// Everything the executor needs to run one task, handed to it by the
/// scheduler at enqueue time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteJob {
    pub task_id: i64,
    pub bot_id: i64,
    pub tracker_id: i64,
    pub config_hash: String,
    pub static_config: Value,
    pub saved_state: Value,
    pub proxy_url: String,
    #[serde(with = "duration_as_secs")]
    pub timeout: Duration,
}

/// How an execute job ended. `TimedOut` is produced by the worker's own
/// wall-clock guard around a task, never by the broker itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecuteOutcome {
    Finished { status: String, result_tree: Value, state: Value },
    Crashed { error: String },
    TimedOut,
}

/// What the reporter receives once it dequeues from `report`: the
/// original job identity plus the outcome that was recorded for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJob {
    pub task_id: i64,
    pub bot_id: i64,
    pub tracker_id: i64,
    pub config_hash: String,
    pub outcome: ExecuteOutcome,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait JobBroker: Send + Sync {
    /// Pushes a new execute job onto `track`.
    async fn enqueue_execute(&self, job: ExecuteJob) -> Result<(), BrokerError>;

    /// Pops the next execute job, if any. Non-blocking: returns `None`
    /// immediately when the queue is empty, so callers own their own
    /// poll loop and backoff.
    async fn dequeue_execute(&self) -> Result<Option<ExecuteJob>, BrokerError>;

    /// Records how an execute job ended and releases its report job
    /// onto `report`. Idempotent: calling it twice for the same
    /// `task_id` (e.g. the failure handler after a timeout wrapper
    /// already recorded `TimedOut`) overwrites the outcome rather than
    /// erroring, matching the reporter's own idempotent no-op update.
    async fn complete_execute(
        &self,
        job: &ExecuteJob,
        outcome: ExecuteOutcome,
    ) -> Result<(), BrokerError>;

    /// Pops the next report job, if any.
    async fn dequeue_report(&self) -> Result<Option<ReportJob>, BrokerError>;
}

mod duration_as_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
