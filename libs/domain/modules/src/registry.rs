// [libs/domain/modules/src/registry.rs]
//! In-memory, read-only-after-start module registry.
//!
//! The source project discovers modules by scanning a directory of
//! Python files at worker start. Rust has no equivalent of "import
//! whatever .py files live under this path" without resorting to
//! dynamic library loading, which is a poor fit for a statically typed
//! plugin contract — so this registry follows the explicit-registration
//! design note instead: built-in modules register themselves by value
//! at worker startup, and a manifest file at the modules root is read
//! only to confirm every family the operator expects to be live is in
//! fact registered (`reconcile_manifest`), surfacing a clear startup
//! error instead of a silent no-op dispatch miss at task time.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::contract::Module;
use crate::errors::ModuleError;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    family: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    modules: Vec<ManifestEntry>,
}

#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        let family = module.descriptor().family.clone();
        self.modules.insert(family, module);
    }

    pub fn get(&self, family: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(family).cloned()
    }

    pub fn families(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Reads `<modules_root>/manifest.json` and errors if it names a
    /// family that was not registered in-process — this is the worker's
    /// sanity check that the modules root it was pointed at actually
    /// matches the binary it's running.
    pub fn reconcile_manifest(&self, modules_root: &Path) -> Result<(), ModuleError> {
        let manifest_path = modules_root.join("manifest.json");
        if !manifest_path.exists() {
            return Err(ModuleError::RootUnreadable(manifest_path.display().to_string()));
        }
        let raw = std::fs::read_to_string(&manifest_path)
            .map_err(|e| ModuleError::RootUnreadable(e.to_string()))?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|e| ModuleError::ManifestInvalid(e.to_string()))?;

        for entry in &manifest.modules {
            if !self.modules.contains_key(&entry.family) {
                return Err(ModuleError::ManifestInvalid(format!(
                    "manifest names family '{}' with no registered implementation",
                    entry.family
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Module, ModuleDescriptor, ModuleInstance};
    use async_trait::async_trait;
    use mtracker_domain_result_tree::ResultNode;
    use serde_json::Value;

    struct FakeModule {
        descriptor: ModuleDescriptor,
    }

    #[async_trait]
    impl Module for FakeModule {
        fn descriptor(&self) -> &ModuleDescriptor {
            &self.descriptor
        }

        fn instantiate(&self, _config: Value, _proxy_url: String, _state: Value) -> Box<dyn ModuleInstance> {
            unimplemented!("not exercised by registry tests")
        }
    }

    fn fake(family: &str) -> Arc<dyn Module> {
        Arc::new(FakeModule {
            descriptor: ModuleDescriptor { family: family.to_string(), critical_params: vec![], proxy_whitelist: None },
        })
    }

    #[test]
    fn register_then_get_round_trips_by_family() {
        let mut registry = ModuleRegistry::new();
        registry.register(fake("demofam"));
        assert!(registry.get("demofam").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn reconcile_manifest_errors_on_missing_root() {
        let registry = ModuleRegistry::new();
        let err = registry.reconcile_manifest(Path::new("/nonexistent/path/so/it/errors")).unwrap_err();
        assert!(matches!(err, ModuleError::RootUnreadable(_)));
    }

    #[test]
    fn reconcile_manifest_errors_on_unregistered_family() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"modules": [{"family": "demofam"}]}"#,
        )
        .unwrap();
        let registry = ModuleRegistry::new();
        let err = registry.reconcile_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ModuleError::ManifestInvalid(_)));
    }

    #[test]
    fn reconcile_manifest_passes_when_every_family_is_registered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("manifest.json"),
            r#"{"modules": [{"family": "demofam"}]}"#,
        )
        .unwrap();
        let mut registry = ModuleRegistry::new();
        registry.register(fake("demofam"));
        registry.reconcile_manifest(dir.path()).unwrap();
    }
}
