// [apps/scheduler/src/main.rs]
//! CLI shell for the scheduler: loads `.env`/INI config, then runs the
//! tick loop and reaper daemon forever. Takes no arguments (spec §6).

use mtracker_scheduler::prelude::*;
use mtracker_shared_config::TrackerConfig;
use mtracker_shared_telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("mtracker_scheduler");

    let config = TrackerConfig::load()?;
    let kernel = SchedulerKernel::ignite(&config).await?;
    kernel.run().await
}
