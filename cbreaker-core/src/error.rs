use thiserror::Error;

/// Errors raised by the breaker itself.
///
/// Failures of the guarded operation are never wrapped in this type; they
/// are returned to the caller exactly as the operation produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BreakerError {
    #[error("Invalid breaker configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, BreakerError>;

impl From<validator::ValidationErrors> for BreakerError {
    fn from(err: validator::ValidationErrors) -> Self {
        BreakerError::InvalidConfig(err.to_string())
    }
}
