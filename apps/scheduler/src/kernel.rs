// [apps/scheduler/src/kernel.rs]
//! Wires up the database and broker, then runs the scheduler tick loop
//! and the reaper daemon side by side until the process is killed.

use std::sync::Arc;

use mtracker_infra_broker::{JobBroker, RedisBroker};
use mtracker_infra_db::TursoClient;
use mtracker_shared_config::TrackerConfig;
use tracing::info;

use crate::proxy_sync::spawn_proxy_sync;
use crate::reaper::spawn_reaper;
use crate::scheduler::run_scheduler_loop;

const REAPER_INTERVAL_SECS: u64 = 60;
const PROXY_SYNC_INTERVAL_SECS: u64 = 300;
const SCHEDULER_TICK_SECS: u64 = 60;

pub struct SchedulerKernel {
    database: TursoClient,
    broker: Arc<dyn JobBroker>,
    proxy: mtracker_shared_config::ProxySection,
    task_timeout_secs: u64,
}

impl SchedulerKernel {
    pub async fn ignite(config: &TrackerConfig) -> anyhow::Result<Self> {
        let database = TursoClient::connect(&config.database.url, None).await?;
        let broker = RedisBroker::connect(&config.redis.host, config.redis.port).await?;

        Ok(Self {
            database,
            broker: Arc::new(broker),
            proxy: config.proxy.clone(),
            task_timeout_secs: config.mtracker.task_timeout_secs,
        })
    }

    /// Runs the scheduler tick loop, the reaper daemon, and the proxy
    /// pool sync daemon forever, side by side. Each shares the same
    /// database handle but runs as its own spawned task so none can
    /// delay the others.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            task_timeout_secs = self.task_timeout_secs,
            scheduler_tick_secs = SCHEDULER_TICK_SECS,
            "scheduler starting"
        );
        spawn_reaper(self.database.clone(), self.task_timeout_secs, REAPER_INTERVAL_SECS).await;
        spawn_proxy_sync(self.database.clone(), self.proxy, PROXY_SYNC_INTERVAL_SECS).await;
        run_scheduler_loop(self.database, self.broker, self.task_timeout_secs, SCHEDULER_TICK_SECS).await;
        Ok(())
    }
}
