// [libs/domain/models/src/lib.rs]
//! Core domain entities shared by every other MTracker crate: trackers,
//! bots, tasks, result records and proxies, plus the configuration hash
//! that ties an ingest request to the tracker it belongs to.

pub mod bot;
pub mod dhash;
pub mod errors;
pub mod proxy;
pub mod result;
pub mod status;
pub mod task;
pub mod tracker;

pub use bot::{Bot, BotRunUpdate, RunOutcome};
pub use dhash::config_dhash;
pub use errors::ModelError;
pub use proxy::{diff_proxies, Proxy, ProxyDescriptor, ProxyDiff};
pub use result::{ResultKind, ResultRecord};
pub use status::Status;
pub use task::Task;
pub use tracker::Tracker;
