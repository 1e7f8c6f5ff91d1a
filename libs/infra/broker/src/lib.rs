// [libs/infra/broker/src/lib.rs]
//! Execute/report job queues. The "runs after completion" dependency
//! (spec 4.E/4.G/§5) is enforced by construction: a report job can only
//! ever be dequeued once `complete_execute` has recorded an outcome for
//! its task, regardless of whether that outcome was success, a crash,
//! or a timeout.

pub mod contract;
pub mod errors;
pub mod memory;
pub mod redis_broker;

pub use contract::{ExecuteJob, ExecuteOutcome, JobBroker, ReportJob};
pub use errors::BrokerError;
pub use memory::InMemoryBroker;
pub use redis_broker::RedisBroker;
