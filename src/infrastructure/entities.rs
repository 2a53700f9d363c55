//! Database entities

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, FromRow)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub text: String,
    pub role: Role,
    /// Unix epoch milliseconds, assigned when the message is first saved.
    pub created_at: i64,
    pub timezone: Option<String>,
}

/// One row of the admin session overview, computed from `messages`.
#[derive(Debug, Clone, FromRow)]
pub struct SessionSummary {
    pub session_id: String,
    pub last_message: String,
    pub last_activity: i64,
    pub message_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Subscriber {
    pub id: String,
    pub email: String,
    pub created_at: i64,
}
