// [libs/infra/broker/src/errors.rs]
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("broker transport fault: {0}")]
    Transport(String),

    #[error("job payload could not be (de)serialized: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("no execute outcome recorded for task {0}; report job cannot be released yet")]
    OutcomeNotReady(i64),
}

impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        BrokerError::Transport(e.to_string())
    }
}
