// [apps/worker/src/builtin.rs]
//! Malware-family module implementations are out of scope (spec
//! Non-goals) — this worker ships no families of its own. A deployment
//! registers its own modules here before `reconcile_manifest` runs,
//! mirroring `apps/api`'s empty builtin set.

use std::sync::Arc;

use mtracker_domain_modules::Module;

pub fn builtin_modules() -> Vec<Arc<dyn Module>> {
    Vec::new()
}
