// [libs/infra/broker/src/memory.rs]
//! In-process broker for `apps/fetch` and tests — no external
//! dependency, single-process semantics only.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::contract::{ExecuteJob, ExecuteOutcome, JobBroker, ReportJob};
use crate::errors::BrokerError;

#[derive(Default)]
pub struct InMemoryBroker {
    track: Mutex<VecDeque<ExecuteJob>>,
    outcomes: Mutex<HashMap<i64, (ExecuteJob, ExecuteOutcome, chrono::DateTime<Utc>)>>,
    report: Mutex<VecDeque<i64>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobBroker for InMemoryBroker {
    async fn enqueue_execute(&self, job: ExecuteJob) -> Result<(), BrokerError> {
        self.track.lock().unwrap().push_back(job);
        Ok(())
    }

    async fn dequeue_execute(&self) -> Result<Option<ExecuteJob>, BrokerError> {
        Ok(self.track.lock().unwrap().pop_front())
    }

    async fn complete_execute(&self, job: &ExecuteJob, outcome: ExecuteOutcome) -> Result<(), BrokerError> {
        self.outcomes
            .lock()
            .unwrap()
            .insert(job.task_id, (job.clone(), outcome, Utc::now()));
        self.report.lock().unwrap().push_back(job.task_id);
        Ok(())
    }

    async fn dequeue_report(&self) -> Result<Option<ReportJob>, BrokerError> {
        let task_id = match self.report.lock().unwrap().pop_front() {
            Some(id) => id,
            None => return Ok(None),
        };
        let (job, outcome, recorded_at) = self
            .outcomes
            .lock()
            .unwrap()
            .get(&task_id)
            .cloned()
            .ok_or(BrokerError::OutcomeNotReady(task_id))?;

        Ok(Some(ReportJob {
            task_id: job.task_id,
            bot_id: job.bot_id,
            tracker_id: job.tracker_id,
            config_hash: job.config_hash,
            outcome,
            recorded_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn job(task_id: i64) -> ExecuteJob {
        ExecuteJob {
            task_id,
            bot_id: 1,
            tracker_id: 1,
            config_hash: "hash".into(),
            static_config: json!({"type": "demofam"}),
            saved_state: json!({}),
            proxy_url: "socks5h://127.0.0.1:1080".into(),
            timeout: Duration::from_secs(900),
        }
    }

    #[tokio::test]
    async fn report_job_is_not_dequeuable_before_execute_completes() {
        let broker = InMemoryBroker::new();
        broker.enqueue_execute(job(1)).await.unwrap();
        assert!(broker.dequeue_report().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn report_job_releases_after_completion_regardless_of_outcome() {
        let broker = InMemoryBroker::new();
        let execute_job = job(7);
        broker.enqueue_execute(execute_job.clone()).await.unwrap();

        let dequeued = broker.dequeue_execute().await.unwrap().unwrap();
        assert_eq!(dequeued.task_id, 7);

        broker.complete_execute(&execute_job, ExecuteOutcome::TimedOut).await.unwrap();

        let report = broker.dequeue_report().await.unwrap().unwrap();
        assert_eq!(report.task_id, 7);
        assert!(matches!(report.outcome, ExecuteOutcome::TimedOut));
    }
}
