// [apps/worker/src/executor.rs]
//! Runs one execute job to completion against a module instance (spec
//! 4.F). True panics and wall-clock overruns are not this module's
//! concern — the job loop wraps `run` in `tokio::spawn` and
//! `tokio::time::timeout` so a genuine crash or hang surfaces as
//! `ExecuteOutcome::Crashed`/`TimedOut` one layer up, never here. What
//! `run` returns is always a clean `(status, result_tree, state)`
//! triple, even when that status is itself `"crashed"` or `"archived"`
//! because the module couldn't be dispatched at all.

use std::path::Path;

use mtracker_domain_modules::registry::ModuleRegistry;
use mtracker_infra_broker::ExecuteJob;
use serde_json::Value;

use crate::log;

/// The three outcomes the executor itself can conclude with, distinct
/// from the true-crash/timeout cases the job loop wraps around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Working,
    Archived,
    Failing,
    Crashed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Working => "working",
            RunStatus::Archived => "archived",
            RunStatus::Failing => "failing",
            RunStatus::Crashed => "crashed",
        }
    }
}

pub struct ExecutionOutput {
    pub status: RunStatus,
    pub result_tree: Value,
    pub state: Value,
}

fn log_path(log_dir: &Path, task_id: i64) -> std::path::PathBuf {
    log_dir.join(format!("{task_id}.log"))
}

/// Runs `job` against the module named by `static_config["type"]`,
/// producing the triple the reporter needs. Never returns an `Err` —
/// every failure mode the spec names (unknown family, missing critical
/// params, a module call raising) is a *result*, not a Rust error.
pub async fn run(registry: &ModuleRegistry, job: &ExecuteJob, log_dir: &Path) -> ExecutionOutput {
    let path = log_path(log_dir, job.task_id);
    let _ = log::append_line(&path, &format!("task {} starting against proxy {}", job.task_id, job.proxy_url));

    let family = job.static_config.get("type").and_then(Value::as_str);
    let module = match family.and_then(|f| registry.get(f)) {
        Some(module) => module,
        None => {
            let _ = log::append_line(
                &path,
                &format!("no module registered for type {:?}; crashing task", family),
            );
            return ExecutionOutput {
                status: RunStatus::Crashed,
                result_tree: mtracker_domain_result_tree::ResultNode::root().to_transport(),
                state: job.saved_state.clone(),
            };
        }
    };

    let missing = module.descriptor().missing_critical_params(&job.static_config);
    if !missing.is_empty() {
        let _ = log::append_line(&path, &format!("missing critical params {missing:?}; archiving bot"));
        return ExecutionOutput {
            status: RunStatus::Archived,
            result_tree: mtracker_domain_result_tree::ResultNode::root().to_transport(),
            state: job.saved_state.clone(),
        };
    }

    let mut instance = module.instantiate(job.static_config.clone(), job.proxy_url.clone(), job.saved_state.clone());

    let mut final_working = false;
    let mut final_archive = false;
    for c2 in instance.get_cnc_servers() {
        let result = match instance.run(&c2).await {
            Ok(result) => result,
            Err(error) => {
                let _ = log::append_line(&path, &format!("run({c2}) raised: {error:#}"));
                mtracker_domain_modules::contract::BotResult::EMPTY
            }
        };

        final_working |= result.is_working();
        final_archive |= result.is_archive();

        if !result.should_continue() {
            break;
        }
    }

    let status = if final_archive {
        RunStatus::Archived
    } else if final_working {
        RunStatus::Working
    } else {
        RunStatus::Failing
    };

    let _ = log::append_line(&path, &format!("task {} finished with status {}", job.task_id, status.as_str()));

    ExecutionOutput { status, result_tree: instance.results().to_transport(), state: instance.state() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mtracker_domain_modules::contract::{BotResult, Module, ModuleDescriptor, ModuleInstance};
    use mtracker_domain_modules::registry::ModuleRegistry;
    use mtracker_domain_result_tree::ResultNode;
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedInstance {
        results_per_call: Vec<BotResult>,
        call: usize,
        tree: ResultNode,
        state: Value,
    }

    #[async_trait]
    impl ModuleInstance for ScriptedInstance {
        fn get_cnc_servers(&self) -> Vec<String> {
            (0..self.results_per_call.len()).map(|i| format!("c2-{i}")).collect()
        }

        async fn run(&mut self, _c2: &String) -> anyhow::Result<BotResult> {
            let result = self.results_per_call[self.call];
            self.call += 1;
            Ok(result)
        }

        fn results(&self) -> &ResultNode {
            &self.tree
        }

        fn state(&self) -> Value {
            self.state.clone()
        }
    }

    struct ScriptedModule {
        descriptor: ModuleDescriptor,
        results_per_call: Vec<BotResult>,
    }

    #[async_trait]
    impl Module for ScriptedModule {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        fn instantiate(&self, _config: Value, _proxy_url: String, state: Value) -> Box<dyn ModuleInstance> {
            Box::new(ScriptedInstance {
                results_per_call: self.results_per_call.clone(),
                call: 0,
                tree: ResultNode::root(),
                state,
            })
        }
    }

    fn job(static_config: Value) -> ExecuteJob {
        ExecuteJob {
            task_id: 1,
            bot_id: 1,
            tracker_id: 1,
            config_hash: "hash".into(),
            static_config,
            saved_state: Value::Object(serde_json::Map::new()),
            proxy_url: "socks5h://127.0.0.1:1080".into(),
            timeout: Duration::from_secs(900),
        }
    }

    fn registry_with(family: &str, critical_params: Vec<String>, results_per_call: Vec<BotResult>) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ScriptedModule {
            descriptor: ModuleDescriptor { family: family.to_string(), critical_params, proxy_whitelist: None },
            results_per_call,
        }));
        registry
    }

    #[tokio::test]
    async fn unregistered_family_crashes_the_task() {
        let registry = ModuleRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let output = run(&registry, &job(serde_json::json!({"type": "nosuchfam"})), dir.path()).await;
        assert_eq!(output.status, RunStatus::Crashed);
    }

    #[tokio::test]
    async fn missing_critical_params_archives_the_bot() {
        let registry = registry_with("demofam", vec!["host".into()], vec![]);
        let dir = tempfile::tempdir().unwrap();
        let output = run(&registry, &job(serde_json::json!({"type": "demofam"})), dir.path()).await;
        assert_eq!(output.status, RunStatus::Archived);
    }

    #[tokio::test]
    async fn a_single_working_result_with_no_continue_reports_working() {
        let registry = registry_with("demofam", vec![], vec![BotResult::WORKING]);
        let dir = tempfile::tempdir().unwrap();
        let output = run(&registry, &job(serde_json::json!({"type": "demofam"})), dir.path()).await;
        assert_eq!(output.status, RunStatus::Working);
    }

    #[tokio::test]
    async fn no_c2_ever_working_or_archiving_reports_failing() {
        let registry = registry_with("demofam", vec![], vec![BotResult::EMPTY]);
        let dir = tempfile::tempdir().unwrap();
        let output = run(&registry, &job(serde_json::json!({"type": "demofam"})), dir.path()).await;
        assert_eq!(output.status, RunStatus::Failing);
    }

    #[tokio::test]
    async fn stops_iterating_c2_list_once_a_result_lacks_continue() {
        let registry = registry_with("demofam", vec![], vec![BotResult::CONTINUE, BotResult::WORKING]);
        let dir = tempfile::tempdir().unwrap();
        let output = run(&registry, &job(serde_json::json!({"type": "demofam"})), dir.path()).await;
        // Only one c2 entry is actually registered by this scripted module's
        // get_cnc_servers (len == results_per_call.len() == 2), but the loop
        // must stop after the first CONTINUE-less... the first entry *is*
        // CONTINUE, so it proceeds to the second, which is WORKING and stops.
        assert_eq!(output.status, RunStatus::Working);
    }

    #[tokio::test]
    async fn archive_dominates_working_even_after_an_earlier_working_result() {
        let registry = registry_with("demofam", vec![], vec![BotResult::WORKING | BotResult::CONTINUE, BotResult::ARCHIVE]);
        let dir = tempfile::tempdir().unwrap();
        let output = run(&registry, &job(serde_json::json!({"type": "demofam"})), dir.path()).await;
        assert_eq!(output.status, RunStatus::Archived);
    }
}
