// [libs/domain/models/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown malware family: {0}")]
    UnknownFamily(String),

    #[error("config is missing required field: {0}")]
    MissingCriticalParam(String),

    #[error(transparent)]
    ParseStatus(#[from] crate::status::ParseStatusError),
}
