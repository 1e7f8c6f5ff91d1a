// [libs/infra/artifact-client/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactClientError {
    #[error("artifact store request to '{0}' failed: {1}")]
    Request(String, reqwest::Error),

    #[error("artifact store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("artifact store response could not be parsed: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("artifact store response is missing the '{0}' field")]
    MissingField(&'static str),
}
