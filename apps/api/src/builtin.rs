// [apps/api/src/builtin.rs]
//! Where this binary's concrete `Module` implementations would register
//! themselves. Malware-family modules are out of scope here — only the
//! `Module`/`ModuleInstance` contract is — so this returns an empty set
//! and the operator's `manifest.json` under `--modules` is expected to
//! declare zero families until a real module crate is wired in here.

use mtracker_domain_modules::Module;
use std::sync::Arc;

pub fn builtin_modules() -> Vec<Arc<dyn Module>> {
    Vec::new()
}
