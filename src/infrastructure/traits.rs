//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities;
use crate::infrastructure::error::{PublishError, StorageError};
use async_trait::async_trait;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Inserts `message` unless a message with the same id exists.
    ///
    /// Returns `Ok(true)` when a row was written and `Ok(false)` when the id was already taken.
    async fn insert_message(&self, message: &entities::Message) -> Result<bool, StorageError>;

    async fn get_message(&self, id: &str) -> Result<Option<entities::Message>, StorageError>;

    /// Messages of a session, oldest first.
    async fn list_session_messages(
        &self,
        session_id: &str,
    ) -> Result<Vec<entities::Message>, StorageError>;

    /// One summary per distinct session, most recently active first.
    async fn session_summaries(&self) -> Result<Vec<entities::SessionSummary>, StorageError>;

    /// Deletes every message of a session and returns how many were removed.
    async fn delete_session(&self, session_id: &str) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Returns `Ok(false)` when the email is already subscribed.
    async fn insert_subscriber(&self, subscriber: &entities::Subscriber)
    -> Result<bool, StorageError>;

    async fn list_subscribers(&self) -> Result<Vec<entities::Subscriber>, StorageError>;

    async fn delete_subscriber(&self, id: &str) -> Result<bool, StorageError>;
}

/// A realtime pub/sub transport.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Delivers `payload` as `event` to every listener on `channel`, except the
    /// connection identified by `exclude`.
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
        exclude: Option<&str>,
    ) -> Result<(), PublishError>;
}
