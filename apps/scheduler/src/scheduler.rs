// [apps/scheduler/src/scheduler.rs]
//! The tick: pick bots due to run, pin each to a task, and enqueue the
//! matching execute job. One `run_bot_task` call per due bot; failures
//! on one bot never stop the tick from reaching the rest.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mtracker_infra_broker::{ExecuteJob, JobBroker};
use mtracker_infra_db::repositories::{bot_repository, proxy_repository, task_repository, tracker_repository};
use mtracker_infra_db::{DbError, TursoClient};
use rand::seq::SliceRandom;
use thiserror::Error;
use tokio::time::interval;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("broker error: {0}")]
    Broker(#[from] mtracker_infra_broker::BrokerError),
}

/// Runs the periodic scheduling loop forever, ticking every
/// `period_secs`. Each tick fetches bots due to run and hands each one
/// to [`run_bot_task`] in turn.
pub async fn run_scheduler_loop(
    database: TursoClient,
    broker: Arc<dyn JobBroker>,
    task_timeout_secs: u64,
    period_secs: u64,
) {
    let mut ticker = interval(Duration::from_secs(period_secs));
    loop {
        ticker.tick().await;
        if let Err(e) = tick(&database, broker.as_ref(), task_timeout_secs).await {
            error!(error = %e, "scheduler tick failed");
        }
    }
}

async fn tick(database: &TursoClient, broker: &dyn JobBroker, task_timeout_secs: u64) -> Result<(), SchedulerError> {
    let connection = database.get_connection()?;
    let now = Utc::now();
    let due = bot_repository::fetch_pending(&connection, now).await?;

    if due.is_empty() {
        return Ok(());
    }
    info!(count = due.len(), "bots due for a run");

    for bot in due {
        let bot_id = bot.id;
        if let Err(e) = run_bot_task(database, broker, bot_id, task_timeout_secs).await {
            error!(bot_id, error = %e, "failed to schedule bot");
        }
    }
    Ok(())
}

/// Schedules one bot's next task (spec 4.E): load the bot and its
/// tracker, pick a proxy uniformly at random from the bot's country
/// group (marking the bot `FAILING` if the group is empty), pin the
/// bot `INPROGRESS` and create its task in one transaction, then
/// enqueue the execute job.
///
/// Reads happen over the plain connection before the transaction
/// opens; only the bot/task writes are transactional, matching the
/// ingest handler's convention.
pub async fn run_bot_task(
    database: &TursoClient,
    broker: &dyn JobBroker,
    bot_id: i64,
    task_timeout_secs: u64,
) -> Result<(), SchedulerError> {
    let connection = database.get_connection()?;
    let now = Utc::now();

    let bot = match bot_repository::get(&connection, bot_id).await? {
        Some(bot) => bot,
        None => {
            warn!(bot_id, "scheduled bot vanished before its tick ran");
            return Ok(());
        }
    };

    let tracker = tracker_repository::get(&connection, bot.tracker_id)
        .await?
        .ok_or(DbError::BotWithoutTracker(bot.id, bot.tracker_id))?;

    let by_country = proxy_repository::by_country(&connection).await?;
    let candidates = by_country.get(&bot.country).cloned().unwrap_or_default();

    let chosen = candidates.choose(&mut rand::thread_rng()).cloned();
    let chosen = match chosen {
        Some(proxy) => proxy,
        None => {
            let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
            let status = bot_repository::mark_failing_no_proxy(&transaction, bot.id, tracker.id, now).await?;
            transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
            warn!(bot_id = bot.id, tracker_id = tracker.id, ?status, "no proxy available for bot's country");
            return Ok(());
        }
    };

    let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
    let task = task_repository::create(&transaction, bot.id, Some(chosen.id), now).await?;
    bot_repository::set_inprogress(&transaction, bot.id).await?;
    transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

    // Stamp the tracker's own config_hash onto the job's static_config
    // so the module instance sees its own fingerprint (spec 4.E step 6).
    let mut static_config = tracker.config.clone();
    if let Some(object) = static_config.as_object_mut() {
        object.insert("_id".to_string(), serde_json::Value::String(tracker.config_hash.clone()));
    }

    let job = ExecuteJob {
        task_id: task.id,
        bot_id: bot.id,
        tracker_id: tracker.id,
        config_hash: tracker.config_hash.clone(),
        static_config,
        saved_state: bot.state.clone(),
        proxy_url: chosen.connection_string(),
        timeout: Duration::from_secs(task_timeout_secs),
    };
    broker.enqueue_execute(job).await?;

    info!(task_id = task.id, bot_id = bot.id, proxy_id = chosen.id, "execute job enqueued");
    Ok(())
}
