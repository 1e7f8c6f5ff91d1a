// [libs/infra/db/src/lib.rs]
//! libSQL-backed persistence for trackers, bots, tasks, results and
//! proxies. Every write path that changes a bot's status recomputes the
//! owning tracker's status in the same transaction — see
//! `repositories::tracker_repository::recompute_status`.

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::TursoClient;
pub use errors::DbError;
pub use repositories::{bot_repository, proxy_repository, result_repository, task_repository, tracker_repository};
