// [apps/scheduler/src/lib.rs]
//! Turns due bots into enqueued execute jobs and sweeps tasks that
//! never reported back. Never mutates task results or bot state beyond
//! the `INPROGRESS` pin it takes when handing a bot off to a worker —
//! that belongs to the reporter and the failure handler.

pub mod kernel;
pub mod proxy_sync;
pub mod reaper;
pub mod scheduler;

pub mod prelude {
    pub use crate::kernel::SchedulerKernel;
}
