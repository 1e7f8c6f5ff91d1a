// [libs/shared/config/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required config field '{0}' is not set in the environment or INI file")]
    MissingRequired(&'static str),

    #[error("config field '{field}' has an invalid value '{value}': {reason}")]
    InvalidValue { field: &'static str, value: String, reason: String },

    #[error("INI file at '{0}' could not be parsed: {1}")]
    IniParse(String, String),
}
