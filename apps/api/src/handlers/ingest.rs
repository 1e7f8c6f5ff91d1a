// [apps/api/src/handlers/ingest.rs]
//! Tracker ingest (spec component 4.I): hash the submitted config,
//! reject unknown families and empty proxy pools, then idempotently
//! create or look up the tracker and fan it out into one bot per
//! eligible, not-yet-covered proxy country.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use mtracker_domain_models::config_dhash;
use mtracker_infra_db::{bot_repository, proxy_repository, tracker_repository, DbError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub family: String,
    pub config: Value,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub tracker_id: i64,
    pub config_hash: String,
    pub tracker_status: String,
    pub bots_created: Vec<String>,
}

pub async fn ingest_tracker(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let response = run_ingest(&state, payload.family, payload.config).await?;
    Ok(Json(response))
}

async fn run_ingest(state: &AppState, family: String, config: Value) -> Result<IngestResponse, ApiError> {
    let module = state.modules.get(&family).ok_or_else(|| ApiError::UnknownFamily(family.clone()))?;
    let config_hash = config_dhash(&config);

    let connection = state.database.get_connection()?;
    let proxy_countries = proxy_repository::countries(&connection).await?;
    if proxy_countries.is_empty() {
        return Err(ApiError::NoProxies(family.clone()));
    }

    let now = Utc::now();
    let transaction = connection.transaction().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

    let tracker = match tracker_repository::get_by_hash(&connection, &config_hash).await? {
        Some(tracker) => tracker,
        None => tracker_repository::create(&transaction, &family, &config, &config_hash, now).await?,
    };

    let covered = bot_repository::countries_for_tracker(&connection, tracker.id).await?;
    let mut bots_created = Vec::new();
    for country in &proxy_countries {
        if covered.contains(country) {
            continue;
        }
        if !module.descriptor().is_country_eligible(country) {
            continue;
        }
        bot_repository::create(&transaction, tracker.id, country, now).await?;
        bots_created.push(country.clone());
    }

    transaction.commit().await.map_err(|e| DbError::TransactionError(e.to_string()))?;

    info!(
        tracker_id = tracker.id,
        family = %family,
        bots_created = bots_created.len(),
        "tracker ingested"
    );

    Ok(IngestResponse {
        tracker_id: tracker.id,
        config_hash,
        tracker_status: tracker.status.to_string(),
        bots_created,
    })
}
