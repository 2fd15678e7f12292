use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Lifecycle record '{0}' not found")]
    NotFound(Uuid),

    #[error("Lifecycle record '{0}' already exists")]
    AlreadyTracked(Uuid),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Double release: {0}")]
    DoubleRelease(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Sweep error: {0}")]
    SweepError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, AuditError>;

impl<T> From<std::sync::PoisonError<T>> for AuditError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
