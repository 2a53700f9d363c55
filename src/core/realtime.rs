//! Channel naming for chat fan-out.

/// Prefix of every per-session chat channel.
pub const CHAT_CHANNEL_PREFIX: &str = "chat-";

/// Event name carrying a saved [`ChatMessage`](crate::core::model::ChatMessage).
pub const NEW_MESSAGE_EVENT: &str = "new-message";

/// The channel a session's messages are published on.
pub fn chat_channel(session_id: &str) -> String {
    format!("{CHAT_CHANNEL_PREFIX}{session_id}")
}
