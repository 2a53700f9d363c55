//! Implementations for the service the app needs.
//!

use crate::core::error::ServiceError;
use crate::core::model::{
    ChatMessage, NewMessage, NewsletterSubscriber, PostedMessage, SessionOverview,
};
use crate::core::realtime::{NEW_MESSAGE_EVENT, chat_channel};
use crate::core::traits::{ChatService, NewsletterService};
use crate::infrastructure::entities::{Message, Subscriber};
use crate::infrastructure::traits::{MessageRepository, Publisher, SubscriberRepository};
use async_trait::async_trait;
use chrono::Utc;
use di::{Ref, injectable};
use log::{info, warn};
use uuid::Uuid;

#[injectable(ChatService)]
pub struct DefaultChatService {
    repo: Ref<dyn MessageRepository>,
    publisher: Ref<dyn Publisher>,
}

impl DefaultChatService {
    pub fn new(repo: Ref<dyn MessageRepository>, publisher: Ref<dyn Publisher>) -> Self {
        DefaultChatService { repo, publisher }
    }

    async fn publish(&self, message: &ChatMessage, socket_id: Option<&str>) {
        let channel = chat_channel(&message.session_id);
        let payload = match serde_json::to_value(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode message {} for {channel}: {e}", message.id);
                return;
            }
        };

        // the stored copy is the source of truth, clients refetch history on reconnect
        if let Err(e) = self
            .publisher
            .publish(&channel, NEW_MESSAGE_EVENT, &payload, socket_id)
            .await
        {
            warn!("failed to publish message {} to {channel}: {e}", message.id);
        }
    }
}

#[async_trait]
impl ChatService for DefaultChatService {
    async fn post_message(&self, message: NewMessage) -> Result<PostedMessage, ServiceError> {
        require_non_empty("id", &message.id)?;
        require_non_empty("sessionId", &message.session_id)?;
        require_non_empty("text", &message.text)?;

        let entity = Message {
            id: message.id,
            session_id: message.session_id,
            text: message.text,
            role: message.role,
            created_at: Utc::now().timestamp_millis(),
            timezone: message.timezone.filter(|tz| !tz.trim().is_empty()),
        };

        if !self.repo.insert_message(&entity).await? {
            let stored = self
                .repo
                .get_message(&entity.id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("message {} vanished", entity.id)))?;

            return Ok(PostedMessage {
                message: stored.into(),
                created: false,
            });
        }

        let saved = ChatMessage::from(entity);
        self.publish(&saved, message.socket_id.as_deref()).await;

        Ok(PostedMessage {
            message: saved,
            created: true,
        })
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ServiceError> {
        Ok(self
            .repo
            .list_session_messages(session_id)
            .await?
            .into_iter()
            .map(ChatMessage::from)
            .collect())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionOverview>, ServiceError> {
        Ok(self
            .repo
            .session_summaries()
            .await?
            .into_iter()
            .map(SessionOverview::from)
            .collect())
    }

    async fn delete_session(&self, session_id: &str) -> Result<u64, ServiceError> {
        let deleted = self.repo.delete_session(session_id).await?;
        if deleted == 0 {
            return Err(ServiceError::NotFound(format!("session {session_id} not found")));
        }

        info!("deleted {deleted} messages of session {session_id}");
        Ok(deleted)
    }
}

#[injectable(NewsletterService)]
pub struct DefaultNewsletterService {
    repo: Ref<dyn SubscriberRepository>,
}

#[async_trait]
impl NewsletterService for DefaultNewsletterService {
    async fn subscribe(&self, email: &str) -> Result<bool, ServiceError> {
        let email = normalize_email(email)?;

        let created = self
            .repo
            .insert_subscriber(&Subscriber {
                id: Uuid::new_v4().to_string(),
                email,
                created_at: Utc::now().timestamp_millis(),
            })
            .await?;

        Ok(created)
    }

    async fn list_subscribers(&self) -> Result<Vec<NewsletterSubscriber>, ServiceError> {
        Ok(self
            .repo
            .list_subscribers()
            .await?
            .into_iter()
            .map(NewsletterSubscriber::from)
            .collect())
    }

    async fn unsubscribe(&self, id: &str) -> Result<(), ServiceError> {
        if self.repo.delete_subscriber(id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("subscriber {id} not found")))
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        Err(ServiceError::InvalidInput(format!("`{field}` must not be empty")))
    } else {
        Ok(())
    }
}

/// Trims and lowercases an address, rejecting anything that is clearly not one.
pub fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let invalid = || ServiceError::InvalidInput(format!("`{email}` is not a valid email address"));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid());
    };

    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty());

    if local.is_empty() || !domain_ok {
        return Err(invalid());
    }

    Ok(email)
}
