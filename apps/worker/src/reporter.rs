// [apps/worker/src/reporter.rs]
//! Finalizes a task once its execute job has completed, whatever that
//! completion looked like (spec 4.G). Always runs — the broker only
//! ever releases a report job after `complete_execute` has recorded
//! an outcome, success or not.

use chrono::Utc;
use mtracker_domain_models::{RunOutcome, Status};
use mtracker_domain_result_tree::{report_tree, ArtifactSink, ResultNode};
use mtracker_infra_broker::{ExecuteOutcome, ReportJob};
use mtracker_infra_db::repositories::{bot_repository, result_repository, task_repository};
use mtracker_infra_db::{DbError, TursoClient};
use thiserror::Error;
use tracing::{info, warn};

const NO_WORKING_C2_ERROR: &str = "no C2 endpoint produced a working or archive result";

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("result tree upload failed: {0}")]
    Report(#[from] mtracker_domain_result_tree::ReportError),
}

fn outcome_for(status: &str) -> (RunOutcome, String) {
    match status {
        "working" => (RunOutcome::Worked, String::new()),
        "archived" => (RunOutcome::Archived, String::new()),
        "failing" => (RunOutcome::Failed, NO_WORKING_C2_ERROR.to_string()),
        _ => (RunOutcome::Crashed, String::new()),
    }
}

/// Finalizes one report job: uploads the result tree (if any), then
/// writes the task's terminal status and the bot's post-run bookkeeping
/// in one transaction.
pub async fn report(
    database: &TursoClient,
    sink: &dyn ArtifactSink,
    task_period_secs: i64,
    max_failing_spree: i32,
    job: ReportJob,
) -> Result<(), ReporterError> {
    let connection = database.get_connection()?;
    let now = Utc::now();

    let (db_status, run_outcome, failure_message, tree, new_state) = match &job.outcome {
        ExecuteOutcome::TimedOut => {
            warn!(task_id = job.task_id, "execute job timed out; reporting as crashed");
            (Status::Crashed, RunOutcome::Crashed, String::new(), None, None)
        }
        ExecuteOutcome::Crashed { error } => {
            warn!(task_id = job.task_id, %error, "execute job crashed; reporting as crashed");
            (Status::Crashed, RunOutcome::Crashed, String::new(), None, None)
        }
        ExecuteOutcome::Finished { status, result_tree, state } => {
            let (outcome, message) = outcome_for(status);
            let db_status = match outcome {
                RunOutcome::Worked => Status::Working,
                RunOutcome::Failed => Status::Failing,
                RunOutcome::Archived => Status::Archived,
                RunOutcome::Crashed => Status::Crashed,
            };
            let tree = if matches!(outcome, RunOutcome::Worked | RunOutcome::Archived) {
                Some(ResultNode::from_transport(result_tree)?)
            } else {
                None
            };
            (db_status, outcome, message, tree, Some(state.clone()))
        }
    };

    if let Some(tree) = &tree {
        if !tree.is_empty_tree() {
            let uploaded = report_tree(sink, tree, None, 0).await?;
            info!(task_id = job.task_id, artifacts = uploaded.len(), "result tree uploaded");
            let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
            for artifact in &uploaded {
                result_repository::record(&transaction, job.task_id, artifact, now).await?;
            }
            transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
        }
    }

    let bot = match bot_repository::get(&connection, job.bot_id).await? {
        Some(bot) => bot,
        None => {
            warn!(bot_id = job.bot_id, task_id = job.task_id, "reported bot no longer exists; dropping report");
            return Ok(());
        }
    };

    let update = bot.plan_run_update(
        run_outcome,
        new_state,
        &failure_message,
        now,
        chrono::Duration::seconds(task_period_secs),
        max_failing_spree,
    );

    let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;
    task_repository::update_after_run(&transaction, job.task_id, db_status, now).await?;
    let tracker_status = bot_repository::update_after_run(&transaction, job.bot_id, job.tracker_id, &update).await?;
    transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

    info!(task_id = job.task_id, bot_id = job.bot_id, status = db_status.as_db_str(), ?tracker_status, "task reported");
    Ok(())
}
