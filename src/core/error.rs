//! Service layer errors.

use crate::infrastructure::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller sent something the service cannot accept.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    /// A fault on the server side that the caller cannot correct.
    #[error("internal error: {0}")]
    Internal(String),
}
