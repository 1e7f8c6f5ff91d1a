// [libs/domain/modules/src/errors.rs]
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("no module registered for family: {0}")]
    UnknownFamily(String),

    #[error("modules root does not exist or is not readable: {0}")]
    RootUnreadable(String),

    #[error("module manifest malformed: {0}")]
    ManifestInvalid(String),
}
