// [libs/domain/result-tree/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("maximum reporting depth reached, result tree may contain a cycle")]
    MaxDepthExceeded,

    #[error("artifact store rejected upload: {0}")]
    Sink(#[from] anyhow::Error),

    #[error("malformed result tree transport payload: {0}")]
    MalformedTransport(String),
}
