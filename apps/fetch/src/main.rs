// [apps/fetch/src/main.rs]
//! One-off module execution outside the scheduler/worker pipeline
//! (spec §6: `fetch --hash|--file --modules --proxy --out
//! {stdout,db,file}`). Runs a single config against a single proxy
//! through the same `executor::run` the worker uses, then routes the
//! resulting tree to stdout, a local file, or the artifact store —
//! never touches the tracker database's bot/task bookkeeping.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mtracker_domain_models::config_dhash;
use mtracker_domain_modules::ModuleRegistry;
use mtracker_domain_result_tree::{report_tree, ArtifactSink, ResultNode, UploadedArtifact};
use mtracker_infra_artifact_client::MwdbArtifactClient;
use mtracker_infra_broker::ExecuteJob;
use mtracker_infra_db::repositories::tracker_repository;
use mtracker_infra_db::TursoClient;
use mtracker_shared_config::TrackerConfig;
use mtracker_shared_telemetry::init_tracing;
use mtracker_worker_lib::builtin::builtin_modules;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutTarget {
    Stdout,
    Db,
    File,
}

#[derive(Parser, Debug)]
#[command(name = "fetch", about = "MTracker one-off module execution")]
struct Cli {
    /// Run the tracker config already on file under this content hash.
    #[arg(long, conflicts_with = "file")]
    hash: Option<String>,

    /// Run a config read from a local JSON file instead of the database.
    #[arg(long, conflicts_with = "hash")]
    file: Option<PathBuf>,

    /// Directory containing the worker's registered modules' manifest.json.
    #[arg(long)]
    modules: PathBuf,

    /// Proxy connection string to run the module through (e.g. socks5://host:1080).
    #[arg(long)]
    proxy: String,

    /// Where to send the resulting tree.
    #[arg(long, value_enum, default_value_t = OutTarget::Stdout)]
    out: OutTarget,

    /// Destination path when `--out file` is chosen. Defaults to `./fetch-result.json`.
    #[arg(long)]
    out_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("mtracker_fetch");

    let cli = Cli::parse();
    let config = TrackerConfig::load()?;

    let static_config = load_static_config(&cli, &config).await?;
    let config_hash = cli.hash.clone().unwrap_or_else(|| config_dhash(&static_config));

    let mut registry = ModuleRegistry::new();
    for module in builtin_modules() {
        registry.register(module);
    }
    registry.reconcile_manifest(&cli.modules)?;

    let job = ExecuteJob {
        task_id: 0,
        bot_id: 0,
        tracker_id: 0,
        config_hash: config_hash.clone(),
        static_config,
        saved_state: Value::Object(serde_json::Map::new()),
        proxy_url: cli.proxy.clone(),
        timeout: Duration::from_secs(config.mtracker.task_timeout_secs),
    };

    let output = mtracker_worker_lib::executor::run(&registry, &job, &config.log.dir).await;
    info!(status = output.status.as_str(), "fetch run finished");

    match cli.out {
        OutTarget::Stdout => {
            println!("status: {}", output.status.as_str());
            println!("{}", serde_json::to_string_pretty(&output.result_tree)?);
        }
        OutTarget::File => {
            let path = cli.out_path.clone().unwrap_or_else(|| PathBuf::from("fetch-result.json"));
            tokio::fs::write(&path, serde_json::to_string_pretty(&output.result_tree)?).await?;
            info!(path = %path.display(), "result tree written to file");
        }
        OutTarget::Db => upload_to_store(&config, &config_hash, &output.result_tree).await?,
    }

    Ok(())
}

/// Resolves the config to run: `--hash` looks it up by content hash in
/// the tracker database, `--file` reads it straight off disk. One of
/// the two is required by the CLI's `conflicts_with` pairing, but
/// neither is itself `required` — guard against both being absent.
async fn load_static_config(cli: &Cli, config: &TrackerConfig) -> anyhow::Result<Value> {
    if let Some(path) = &cli.file {
        let raw = tokio::fs::read_to_string(path).await?;
        return Ok(serde_json::from_str(&raw)?);
    }

    if let Some(hash) = &cli.hash {
        let database = TursoClient::connect(&config.database.url, None).await?;
        let connection = database.get_connection()?;
        let tracker = tracker_repository::get_by_hash(&connection, hash)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no tracker found for config hash {hash}"))?;
        return Ok(tracker.config);
    }

    anyhow::bail!("one of --hash or --file is required")
}

/// Uploads the result tree to the artifact store. If `config_hash` is
/// already on file (`query_config` lookup), the redundant root config
/// upload is skipped and its children are parented directly off the
/// existing entry's sha256; everything else in the tree uploads as
/// normal. Avoids churning duplicate config rows across repeated
/// ad-hoc runs of the same tracker.
async fn upload_to_store(config: &TrackerConfig, config_hash: &str, result_tree: &Value) -> anyhow::Result<()> {
    let tree = ResultNode::from_transport(result_tree)?;
    if tree.is_empty_tree() {
        info!("result tree is empty; nothing to upload");
        return Ok(());
    }

    let sink = MwdbArtifactClient::new(config.mwdb.api_url(), config.mwdb.token.clone());

    let existing_sha256 = sink
        .query_config(config_hash)
        .await?
        .and_then(|entry| entry.get("sha256").and_then(Value::as_str).map(str::to_string));

    let uploaded = match existing_sha256 {
        Some(sha256) => {
            info!(config_hash, sha256, "config already on file; skipping redundant root upload");
            upload_children_of_known_config(&sink, &tree, &sha256).await?
        }
        None => report_tree(&sink, &tree, None, 0).await?,
    };

    info!(artifacts = uploaded.len(), "result tree uploaded to artifact store");
    for artifact in &uploaded {
        println!("{} {}", artifact.kind, artifact.sha256);
    }
    Ok(())
}

/// Uploads everything under `tree` except a top-level `Config` node
/// already known to the store: that node's own upload is skipped and
/// its children are parented off `existing_sha256` instead. Any other
/// top-level sibling (a `Binary`/`Blob` alongside the config, or a
/// nested `Generic` grouping) uploads exactly as `report_tree` would.
async fn upload_children_of_known_config(
    sink: &dyn ArtifactSink,
    tree: &ResultNode,
    existing_sha256: &str,
) -> anyhow::Result<Vec<UploadedArtifact>> {
    let mut uploaded = Vec::new();
    for child in tree.children() {
        match child {
            ResultNode::Config { children, .. } => {
                for grandchild in children {
                    let mut results = report_tree(sink, grandchild, Some(existing_sha256), 1).await?;
                    uploaded.append(&mut results);
                }
            }
            other => {
                let mut results = report_tree(sink, other, None, 1).await?;
                uploaded.append(&mut results);
            }
        }
    }
    Ok(uploaded)
}
