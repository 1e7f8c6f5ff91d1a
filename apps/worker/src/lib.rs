// [apps/worker/src/lib.rs]
//! Executes and reports scheduled tasks (spec 4.F/4.G/4.H). Drains
//! execute jobs off the broker's `track` queue and runs them against
//! the module registry; drains report jobs off `report` once an
//! outcome has been recorded, finalizing task and bot state and
//! uploading any result tree produced.

pub mod builtin;
pub mod executor;
pub mod failure_handler;
pub mod kernel;
pub mod log;
pub mod reporter;

pub mod prelude {
    pub use crate::kernel::WorkerKernel;
}
