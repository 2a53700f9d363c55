//! Domain types shared by the HTTP layer, the realtime payloads and the widget.

use crate::infrastructure::entities;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::infrastructure::entities::Role;

/// A saved chat message, in the shape sent to clients and published on channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub text: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl From<entities::Message> for ChatMessage {
    fn from(message: entities::Message) -> Self {
        ChatMessage {
            id: message.id,
            session_id: message.session_id,
            text: message.text,
            role: message.role,
            timestamp: from_millis(message.created_at),
            timezone: message.timezone,
        }
    }
}

/// A message as submitted by a client, before it is stored.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub session_id: String,
    pub text: String,
    pub role: Role,
    pub timezone: Option<String>,
    /// Connection of the sender, excluded from the realtime echo.
    pub socket_id: Option<String>,
}

/// Outcome of saving a message.
#[derive(Debug, Clone)]
pub struct PostedMessage {
    /// The stored record. For a duplicate id this is the first write, unchanged.
    pub message: ChatMessage,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOverview {
    pub session_id: String,
    pub last_message: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: i64,
}

impl From<entities::SessionSummary> for SessionOverview {
    fn from(summary: entities::SessionSummary) -> Self {
        SessionOverview {
            session_id: summary.session_id,
            last_message: summary.last_message,
            last_activity: from_millis(summary.last_activity),
            message_count: summary.message_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<entities::Subscriber> for NewsletterSubscriber {
    fn from(subscriber: entities::Subscriber) -> Self {
        NewsletterSubscriber {
            id: subscriber.id,
            email: subscriber.email,
            created_at: from_millis(subscriber.created_at),
        }
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
