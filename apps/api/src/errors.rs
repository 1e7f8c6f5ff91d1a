// [apps/api/src/errors.rs]
//! Maps the library-layer error enums onto HTTP responses for the
//! ingest endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mtracker_infra_db::DbError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown module family '{0}'")]
    UnknownFamily(String),

    #[error("no proxies available for family '{0}'")]
    NoProxies(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownFamily(_) | ApiError::NoProxies(_) => StatusCode::BAD_REQUEST,
            ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            error!(error = %self, "ingest request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
