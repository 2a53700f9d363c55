//! DI "Interfaces"

use crate::core::error::ServiceError;
use crate::core::model::{
    ChatMessage, NewMessage, NewsletterSubscriber, PostedMessage, SessionOverview,
};
use async_trait::async_trait;

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Saves a message and publishes the saved copy on the session's channel.
    ///
    /// Saving an id that already exists is not an error: the stored message is returned
    /// untouched with `created == false` and nothing is published. A failed publish is
    /// logged and does not fail the call.
    async fn post_message(&self, message: NewMessage) -> Result<PostedMessage, ServiceError>;

    /// Lists the persisted history of a session, oldest first.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ServiceError>;

    /// Summarises every session that has at least one message, most recent activity first.
    async fn list_sessions(&self) -> Result<Vec<SessionOverview>, ServiceError>;

    /// Deletes all messages of a session.
    ///
    /// Returns `Err(NotFound)` if the session had no messages.
    async fn delete_session(&self, session_id: &str) -> Result<u64, ServiceError>;
}

#[async_trait]
pub trait NewsletterService: Send + Sync {
    /// Subscribes an email address. Returns `false` if it was already subscribed.
    async fn subscribe(&self, email: &str) -> Result<bool, ServiceError>;

    async fn list_subscribers(&self) -> Result<Vec<NewsletterSubscriber>, ServiceError>;

    async fn unsubscribe(&self, id: &str) -> Result<(), ServiceError>;
}
