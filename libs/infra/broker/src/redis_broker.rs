// [libs/infra/broker/src/redis_broker.rs]
//! Redis-backed broker for multi-process deployment (spec §6:
//! `redis.host`/`redis.port`). `ConnectionManager` is cheaply `Clone`
//! and reconnects transparently, so every call clones it rather than
//! holding a `Mutex` across awaits.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::contract::{ExecuteJob, ExecuteOutcome, JobBroker, ReportJob};
use crate::errors::BrokerError;

const TRACK_QUEUE: &str = "mtracker:track";
const REPORT_QUEUE: &str = "mtracker:report";

fn outcome_key(task_id: i64) -> String {
    format!("mtracker:outcome:{task_id}")
}

#[derive(Clone)]
pub struct RedisBroker {
    manager: ConnectionManager,
}

impl RedisBroker {
    pub async fn connect(host: &str, port: u16) -> Result<Self, BrokerError> {
        let client = redis::Client::open(format!("redis://{host}:{port}"))?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredOutcome {
    job: ExecuteJob,
    outcome: ExecuteOutcome,
    recorded_at: chrono::DateTime<Utc>,
}

#[async_trait]
impl JobBroker for RedisBroker {
    async fn enqueue_execute(&self, job: ExecuteJob) -> Result<(), BrokerError> {
        let payload = serde_json::to_string(&job)?;
        let mut conn = self.manager.clone();
        conn.rpush::<_, _, ()>(TRACK_QUEUE, payload).await?;
        Ok(())
    }

    async fn dequeue_execute(&self) -> Result<Option<ExecuteJob>, BrokerError> {
        let mut conn = self.manager.clone();
        let payload: Option<String> = conn.lpop(TRACK_QUEUE, None).await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    async fn complete_execute(&self, job: &ExecuteJob, outcome: ExecuteOutcome) -> Result<(), BrokerError> {
        let stored = StoredOutcome { job: job.clone(), outcome, recorded_at: Utc::now() };
        let payload = serde_json::to_string(&stored)?;
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(outcome_key(job.task_id), payload).await?;
        conn.rpush::<_, _, ()>(REPORT_QUEUE, job.task_id).await?;
        Ok(())
    }

    async fn dequeue_report(&self) -> Result<Option<ReportJob>, BrokerError> {
        let mut conn = self.manager.clone();
        let task_id: Option<i64> = conn.lpop(REPORT_QUEUE, None).await?;
        let task_id = match task_id {
            Some(id) => id,
            None => return Ok(None),
        };

        let payload: Option<String> = conn.get(outcome_key(task_id)).await?;
        let stored: StoredOutcome = match payload {
            Some(p) => serde_json::from_str(&p)?,
            None => return Err(BrokerError::OutcomeNotReady(task_id)),
        };

        Ok(Some(ReportJob {
            task_id: stored.job.task_id,
            bot_id: stored.job.bot_id,
            tracker_id: stored.job.tracker_id,
            config_hash: stored.job.config_hash,
            outcome: stored.outcome,
            recorded_at: stored.recorded_at,
        }))
    }
}
