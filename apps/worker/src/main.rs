// [apps/worker/src/main.rs]
//! CLI shell for the worker: loads `.env` and the tracker config,
//! builds the module registry from `<modules_path>/manifest.json`, and
//! hands off to the kernel's execute/report loops (spec §6: `worker
//! <modules_path>`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use mtracker_infra_broker::RedisBroker;
use mtracker_infra_db::TursoClient;
use mtracker_shared_config::TrackerConfig;
use mtracker_shared_telemetry::init_tracing;
use mtracker_worker_lib::builtin::builtin_modules;
use mtracker_worker_lib::kernel::WorkerKernel;

#[derive(Parser, Debug)]
#[command(name = "worker", about = "MTracker task execution worker")]
struct Cli {
    /// Directory containing this worker's registered modules' manifest.json.
    modules_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("mtracker_worker");

    let cli = Cli::parse();
    let config = TrackerConfig::load()?;

    let database = TursoClient::connect(&config.database.url, None).await?;
    let broker = RedisBroker::connect(&config.redis.host, config.redis.port).await?;

    let mut registry = mtracker_domain_modules::ModuleRegistry::new();
    for module in builtin_modules() {
        registry.register(module);
    }
    registry.reconcile_manifest(&cli.modules_path)?;

    let artifact_sink = Arc::new(mtracker_infra_artifact_client::MwdbArtifactClient::new(
        config.mwdb.api_url(),
        config.mwdb.token.clone(),
    ));

    let kernel = WorkerKernel {
        database,
        broker: Arc::new(broker),
        registry: Arc::new(registry),
        artifact_sink,
        log_dir: config.log.dir.clone(),
        task_period_secs: config.mtracker.task_period_secs as i64,
        max_failing_spree: config.mtracker.max_failing_spree,
    };

    kernel.run().await
}
