// [apps/api/src/main.rs]
//! CLI shell for the ingest API: loads `.env`, parses the modules root
//! and listening port, then hands off to the kernel.

use std::path::PathBuf;

use clap::Parser;
use mtracker_api::prelude::*;
use mtracker_shared_telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "api", about = "MTracker tracker-ingest HTTP surface")]
struct Cli {
    /// Directory containing this worker's registered modules' manifest.json.
    #[arg(long, env = "MTRACKER_MODULES_PATH")]
    modules: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("mtracker_api");

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let database_token = std::env::var("TURSO_AUTH_TOKEN").ok();

    let kernel = ApiKernel::ignite(&database_url, database_token, &cli.modules, cli.port).await?;
    kernel.launch().await
}
