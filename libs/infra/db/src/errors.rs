// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE -> {0}")]
    TransactionError(String),

    #[error("[L3_TRACKER_FAULT]: TRACKER_NOT_FOUND -> {0}")]
    TrackerNotFound(i64),

    #[error("[L3_BOT_FAULT]: BOT_NOT_FOUND -> {0}")]
    BotNotFound(i64),

    /// A bot row referenced a tracker_id with no matching tracker row.
    /// This should be unreachable under the foreign key, and surfaces
    /// as a fatal inconsistency rather than a recoverable miss.
    #[error("[L3_BOT_FAULT]: BOT_WITHOUT_TRACKER -> bot {0} references missing tracker {1}")]
    BotWithoutTracker(i64, i64),

    #[error("[L3_TASK_FAULT]: TASK_NOT_FOUND -> {0}")]
    TaskNotFound(i64),

    #[error("[L3_PROXY_FAULT]: NO_ELIGIBLE_PROXY -> country {0}")]
    NoEligibleProxy(String),
}
