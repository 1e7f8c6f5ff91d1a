// [apps/api/src/kernel.rs]
//! Builds the application state and serves the HTTP surface. Mirrors
//! the teacher's ignite/launch split so `main.rs` stays a thin shell.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use mtracker_domain_modules::ModuleRegistry;
use mtracker_infra_db::TursoClient;
use tracing::info;

use crate::builtin::builtin_modules;
use crate::routes::build_router;
use crate::state::AppState;

pub struct ApiKernel {
    pub state: AppState,
    pub port: u16,
}

impl ApiKernel {
    pub async fn ignite(
        database_url: &str,
        database_token: Option<String>,
        modules_root: &Path,
        port: u16,
    ) -> anyhow::Result<Self> {
        let database = TursoClient::connect(database_url, database_token).await?;

        let mut registry = ModuleRegistry::new();
        for module in builtin_modules() {
            registry.register(module);
        }
        registry.reconcile_manifest(modules_root)?;
        info!(families = registry.len(), "module registry reconciled");

        let state = AppState { database, modules: Arc::new(registry) };
        Ok(Self { state, port })
    }

    pub async fn launch(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = build_router(self.state);

        info!(%addr, "ingest api listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }
}
