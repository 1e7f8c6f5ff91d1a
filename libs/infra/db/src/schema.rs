// [libs/infra/db/src/schema.rs]
/*!
 * =================================================================
 * APARATO: MTRACKER RELATIONAL SCHEMA (V1.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL DE TRACKERS/BOTS/TASKS
 *
 * Applies the five core tables (spec.md §3) idempotently via
 * `CREATE TABLE IF NOT EXISTS`, followed by the indexes the
 * scheduler's `fetch_pending` and the proxy synchronizer rely on.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument};

const TABLES: &[(&str, &str)] = &[
    ("TABLE_TRACKERS", r#"
        CREATE TABLE IF NOT EXISTS trackers (
            tracker_id INTEGER PRIMARY KEY AUTOINCREMENT,
            family TEXT NOT NULL,
            config TEXT NOT NULL,
            config_hash TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_PROXIES", r#"
        CREATE TABLE IF NOT EXISTS proxies (
            proxy_id INTEGER PRIMARY KEY AUTOINCREMENT,
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            country TEXT NOT NULL,
            username TEXT,
            password TEXT,
            UNIQUE(host, port, country, username, password)
        );
    "#),
    ("TABLE_BOTS", r#"
        CREATE TABLE IF NOT EXISTS bots (
            bot_id INTEGER PRIMARY KEY AUTOINCREMENT,
            tracker_id INTEGER NOT NULL REFERENCES trackers(tracker_id),
            country TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            state TEXT NOT NULL DEFAULT '{}',
            failing_spree INTEGER NOT NULL DEFAULT 0,
            last_error TEXT NOT NULL DEFAULT '',
            next_execution TEXT,
            UNIQUE(tracker_id, country)
        );
    "#),
    ("TABLE_TASKS", r#"
        CREATE TABLE IF NOT EXISTS tasks (
            task_id INTEGER PRIMARY KEY AUTOINCREMENT,
            bot_id INTEGER NOT NULL REFERENCES bots(bot_id),
            proxy_id INTEGER REFERENCES proxies(proxy_id),
            status TEXT NOT NULL DEFAULT 'inprogress',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            finished_at TEXT
        );
    "#),
    ("TABLE_RESULTS", r#"
        CREATE TABLE IF NOT EXISTS results (
            result_id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id INTEGER NOT NULL REFERENCES tasks(task_id),
            result_type TEXT NOT NULL,
            name TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            upload_time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
    "#),
];

const INDEXES: &[(&str, &str)] = &[
    ("IDX_BOTS_PENDING", "CREATE INDEX IF NOT EXISTS idx_bots_pending ON bots(status, next_execution);"),
    ("IDX_BOTS_TRACKER", "CREATE INDEX IF NOT EXISTS idx_bots_tracker ON bots(tracker_id);"),
    ("IDX_TASKS_BOT", "CREATE INDEX IF NOT EXISTS idx_tasks_bot ON tasks(bot_id);"),
    ("IDX_RESULTS_TASK", "CREATE INDEX IF NOT EXISTS idx_results_task ON results(task_id);"),
    ("IDX_PROXIES_COUNTRY", "CREATE INDEX IF NOT EXISTS idx_proxies_country ON proxies(country);"),
];

#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA]: Synchronizing mtracker relational schema...");

    for (identifier, sql) in TABLES {
        debug!("  ↳ ensuring {}", identifier);
        connection
            .execute(sql, ())
            .await
            .with_context(|| format!("failed to materialize {identifier}"))?;
    }
    for (identifier, sql) in INDEXES {
        debug!("  ↳ hardening {}", identifier);
        connection
            .execute(sql, ())
            .await
            .with_context(|| format!("failed to materialize {identifier}"))?;
    }

    info!("✅ [SCHEMA]: mtracker schema level and certified.");
    Ok(())
}
