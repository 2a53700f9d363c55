//! Infrastructure error types.

use thiserror::Error;

/// Errors raised by the SQLite repositories.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The pool could not hand out a working connection.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StorageError::Unavailable(e),
            other => StorageError::Query(other),
        }
    }
}

/// Errors raised while handing a message to a realtime channel.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid signing key: {0}")]
    Signing(#[from] hmac::digest::InvalidLength),

    #[error("realtime transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("realtime service rejected publish with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
