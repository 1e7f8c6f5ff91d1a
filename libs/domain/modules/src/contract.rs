// [libs/domain/modules/src/contract.rs]
//! The `Module` capability trait (spec.md 4.B) and the `BotResult` flag
//! set a `run` invocation returns.
//!
//! Modules are expressed as a capability, not a base class: a family is
//! registered as a boxed trait object, never through inheritance. Each
//! task creates one fresh module instance and discards it when the task
//! ends — there is no module-owned state that survives past one task's
//! `get_cnc_servers`/`run` sequence other than what is threaded back out
//! through `BotResult`'s companion return value.

use async_trait::async_trait;
use mtracker_domain_result_tree::ResultNode;
use serde_json::Value;
use std::ops::{BitOr, BitOrAssign};

/// A C2 endpoint as yielded by `get_cnc_servers`. Modules are free to
/// encode whatever shape they need (URL, `host:port`, opaque token) as
/// long as it round-trips through their own `run`.
pub type Cnc = String;

/// Bitset of independent flags a module's `run` returns, mirroring the
/// source `IntFlag`. `Archive` dominates `Working`; `Continue` is
/// orthogonal to both and is the sole control for whether the executor
/// advances to the next C2 in the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotResult {
    working: bool,
    continue_: bool,
    archive: bool,
}

impl BotResult {
    pub const EMPTY: BotResult = BotResult { working: false, continue_: false, archive: false };
    pub const WORKING: BotResult = BotResult { working: true, continue_: false, archive: false };
    pub const CONTINUE: BotResult = BotResult { working: false, continue_: true, archive: false };
    pub const ARCHIVE: BotResult = BotResult { working: false, continue_: false, archive: true };

    pub const fn is_working(self) -> bool {
        self.working
    }

    pub const fn should_continue(self) -> bool {
        self.continue_
    }

    pub const fn is_archive(self) -> bool {
        self.archive
    }
}

impl BitOr for BotResult {
    type Output = BotResult;

    fn bitor(self, rhs: BotResult) -> BotResult {
        BotResult {
            working: self.working || rhs.working,
            continue_: self.continue_ || rhs.continue_,
            archive: self.archive || rhs.archive,
        }
    }
}

impl BitOrAssign for BotResult {
    fn bitor_assign(&mut self, rhs: BotResult) {
        *self = *self | rhs;
    }
}

/// Static facts about a registered module, read by the executor before
/// it ever instantiates one (critical-param validation, proxy country
/// eligibility for ingest fan-out).
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub family: String,
    pub critical_params: Vec<String>,
    /// `None` means any country is eligible; `Some(set)` restricts which
    /// proxy countries a bot for this family may be created for.
    pub proxy_whitelist: Option<Vec<String>>,
}

impl ModuleDescriptor {
    pub fn is_country_eligible(&self, country: &str) -> bool {
        match &self.proxy_whitelist {
            None => true,
            Some(allowed) => allowed.iter().any(|c| c.eq_ignore_ascii_case(country)),
        }
    }

    pub fn missing_critical_params(&self, config: &Value) -> Vec<String> {
        let Some(obj) = config.as_object() else {
            return self.critical_params.clone();
        };
        self.critical_params
            .iter()
            .filter(|key| !obj.contains_key(key.as_str()))
            .cloned()
            .collect()
    }
}

/// The per-task capability every family module implements. A fresh
/// instance is constructed for every task (`config`, the proxy's
/// connection string, and the bot's saved state from the previous run);
/// it is dropped once the executor finishes consuming `get_cnc_servers`.
#[async_trait]
pub trait Module: Send + Sync {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Builds one instance of this module for a single task. `state` is
    /// the bot's saved state carried over from its previous run
    /// (`{}` on a bot's first run).
    fn instantiate(&self, config: Value, proxy_url: String, state: Value) -> Box<dyn ModuleInstance>;
}

/// A module instance bound to one task. `get_cnc_servers` is consulted
/// once at the start of the task; `run` is invoked once per yielded C2,
/// in order, until either the list is exhausted or a result without
/// `CONTINUE` is returned.
#[async_trait]
pub trait ModuleInstance: Send {
    fn get_cnc_servers(&self) -> Vec<Cnc>;

    async fn run(&mut self, c2: &Cnc) -> anyhow::Result<BotResult>;

    /// The result tree accumulated so far across every `run` invocation
    /// in this task. Called once after the C2 loop finishes.
    fn results(&self) -> &ResultNode;

    /// The module's saved state, possibly mutated across `run` calls,
    /// to be threaded into the bot's next task.
    fn state(&self) -> Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_dominates_working_when_combined() {
        let combined = BotResult::WORKING | BotResult::ARCHIVE;
        assert!(combined.is_working());
        assert!(combined.is_archive());
    }

    #[test]
    fn continue_is_orthogonal() {
        let combined = BotResult::WORKING | BotResult::CONTINUE;
        assert!(combined.should_continue());
        assert!(combined.is_working());
        assert!(!combined.is_archive());
    }

    #[test]
    fn empty_result_has_no_flags() {
        assert!(!BotResult::EMPTY.is_working());
        assert!(!BotResult::EMPTY.should_continue());
        assert!(!BotResult::EMPTY.is_archive());
    }

    #[test]
    fn descriptor_reports_missing_critical_params() {
        let descriptor = ModuleDescriptor {
            family: "demofam".into(),
            critical_params: vec!["host".into(), "port".into()],
            proxy_whitelist: None,
        };
        let config = serde_json::json!({"type": "demofam", "host": "1.2.3.4"});
        assert_eq!(descriptor.missing_critical_params(&config), vec!["port".to_string()]);
    }

    #[test]
    fn descriptor_whitelist_restricts_countries() {
        let descriptor = ModuleDescriptor {
            family: "demofam".into(),
            critical_params: vec![],
            proxy_whitelist: Some(vec!["us".into(), "de".into()]),
        };
        assert!(descriptor.is_country_eligible("US"));
        assert!(!descriptor.is_country_eligible("pl"));
    }

    #[test]
    fn descriptor_without_whitelist_accepts_any_country() {
        let descriptor = ModuleDescriptor { family: "demofam".into(), critical_params: vec![], proxy_whitelist: None };
        assert!(descriptor.is_country_eligible("zz"));
    }
}
