// [apps/worker/src/kernel.rs]
//! Drives two independent poll loops against the broker: one drains
//! `track` and runs execute jobs, the other drains `report` and
//! finalizes them (spec §5's two-queue concurrency model). Both loops
//! back off with a short sleep when their queue comes up empty, rather
//! than busy-polling.
//!
//! The execute loop is also the only place a genuine crash or hang is
//! observable: `executor::run` itself never panics on a module's
//! behalf (spec 4.F already turns a bad dispatch into a clean result),
//! so anything that reaches `JoinError` here is a true uncaught panic,
//! and only that case invokes the failure handler (spec 4.H). A
//! timeout is not an uncaught exception — spec §5 treats it as the
//! execute job simply failing to produce a result in time, which the
//! reporter already handles idempotently by treating a resultless
//! outcome as crashed. Forcing `handle_crash` onto a timeout as well
//! would mark the bot crashed twice over for the same event and write
//! a log line with no trace to show for it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mtracker_domain_modules::ModuleRegistry;
use mtracker_domain_result_tree::ArtifactSink;
use mtracker_infra_broker::{ExecuteOutcome, JobBroker};
use mtracker_infra_db::TursoClient;
use tracing::{error, info, warn};

use crate::{executor, failure_handler, reporter};

const IDLE_BACKOFF: Duration = Duration::from_millis(500);

pub struct WorkerKernel {
    pub database: TursoClient,
    pub broker: Arc<dyn JobBroker>,
    pub registry: Arc<ModuleRegistry>,
    pub artifact_sink: Arc<dyn ArtifactSink>,
    pub log_dir: PathBuf,
    pub task_period_secs: i64,
    pub max_failing_spree: i32,
}

impl WorkerKernel {
    /// Runs the execute loop and the report loop concurrently until the
    /// process is killed.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(log_dir = %self.log_dir.display(), "worker starting");
        let execute_side = run_execute_loop(self.database.clone(), self.broker.clone(), self.registry, self.log_dir.clone());
        let report_side =
            run_report_loop(self.database, self.broker, self.artifact_sink, self.task_period_secs, self.max_failing_spree);
        tokio::join!(execute_side, report_side);
        Ok(())
    }
}

async fn run_execute_loop(database: TursoClient, broker: Arc<dyn JobBroker>, registry: Arc<ModuleRegistry>, log_dir: PathBuf) {
    loop {
        let job = match broker.dequeue_execute().await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::time::sleep(IDLE_BACKOFF).await;
                continue;
            }
            Err(e) => {
                error!(error = %e, "failed to dequeue execute job");
                tokio::time::sleep(IDLE_BACKOFF).await;
                continue;
            }
        };

        let outcome = run_one_execute_job(&database, &registry, &log_dir, &job).await;
        if let Err(e) = broker.complete_execute(&job, outcome).await {
            error!(task_id = job.task_id, error = %e, "failed to record execute outcome");
        }
    }
}

async fn run_one_execute_job(
    database: &TursoClient,
    registry: &Arc<ModuleRegistry>,
    log_dir: &Path,
    job: &mtracker_infra_broker::ExecuteJob,
) -> ExecuteOutcome {
    let task_id = job.task_id;
    let bot_id = job.bot_id;
    let tracker_id = job.tracker_id;
    let registry = registry.clone();
    let job_owned = job.clone();
    let log_dir_owned = log_dir.to_path_buf();

    let handle = tokio::spawn(async move { executor::run(&registry, &job_owned, &log_dir_owned).await });

    match tokio::time::timeout(job.timeout, handle).await {
        Ok(Ok(output)) => {
            ExecuteOutcome::Finished { status: output.status.as_str().to_string(), result_tree: output.result_tree, state: output.state }
        }
        Ok(Err(join_error)) => {
            let trace = join_error.to_string();
            warn!(task_id, %trace, "execute job panicked");
            if let Err(e) = failure_handler::handle_crash(database, log_dir, task_id, bot_id, tracker_id, &trace).await {
                error!(task_id, error = %e, "failure handler itself failed");
            }
            ExecuteOutcome::Crashed { error: trace }
        }
        Err(_elapsed) => {
            warn!(task_id, timeout_secs = job.timeout.as_secs(), "execute job timed out");
            ExecuteOutcome::TimedOut
        }
    }
}

async fn run_report_loop(
    database: TursoClient,
    broker: Arc<dyn JobBroker>,
    artifact_sink: Arc<dyn ArtifactSink>,
    task_period_secs: i64,
    max_failing_spree: i32,
) {
    loop {
        let job = match broker.dequeue_report().await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::time::sleep(IDLE_BACKOFF).await;
                continue;
            }
            Err(e) => {
                error!(error = %e, "failed to dequeue report job");
                tokio::time::sleep(IDLE_BACKOFF).await;
                continue;
            }
        };

        let task_id = job.task_id;
        if let Err(e) = reporter::report(&database, artifact_sink.as_ref(), task_period_secs, max_failing_spree, job).await {
            error!(task_id, error = %e, "failed to report task outcome");
        }
    }
}
