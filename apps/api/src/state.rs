// [apps/api/src/state.rs]
//! Shared, read-only-after-start application state handed to every
//! handler: the database client and the reconciled module registry.

use std::sync::Arc;

use mtracker_domain_modules::ModuleRegistry;
use mtracker_infra_db::TursoClient;

#[derive(Clone)]
pub struct AppState {
    pub database: TursoClient,
    pub modules: Arc<ModuleRegistry>,
}
