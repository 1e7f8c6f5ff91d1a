// [apps/api/src/routes.rs]
//! The ingest app's entire HTTP surface: one write endpoint and a health
//! probe. No read endpoints, GraphQL, or WebSockets — operators query
//! the database or the artifact store directly for everything else.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::ingest::ingest_tracker;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/trackers", post(ingest_tracker))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
