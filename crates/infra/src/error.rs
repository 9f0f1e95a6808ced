use thiserror::Error;

use spm_core::DomainError;

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error returned by every service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic business failure (validation, lifecycle, structure).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The document store failed. Earlier writes of the same call stay committed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Publication failed after the change was committed.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl ServiceError {
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            _ => None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(err) => err.code(),
            ServiceError::Store(_) => "store_error",
            ServiceError::Publish(_) => "publish_error",
        }
    }
}
