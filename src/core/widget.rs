//! Client-side chat widget state.
//!
//! The widget keeps one session id per browser storage, appends its own
//! messages optimistically and ignores server echoes it has already shown.

use crate::core::model::{ChatMessage, Role};
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Storage key holding the visitor's session id.
pub const SESSION_STORAGE_KEY: &str = "chat_session_id";

/// Key/value storage that survives page reloads, like a browser's local storage.
pub trait ClientStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_owned(), value);
    }
}

/// Returns the stored session id, generating and storing one on first use.
pub fn session_id(storage: &mut impl ClientStorage) -> String {
    if let Some(existing) = storage.get(SESSION_STORAGE_KEY) {
        return existing;
    }

    let fresh = Uuid::new_v4().to_string();
    storage.set(SESSION_STORAGE_KEY, fresh.clone());
    fresh
}

/// Body of `POST /chat/messages` as the widget sends it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub id: String,
    pub session_id: String,
    pub text: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
}

#[derive(Debug)]
pub struct ChatWidget {
    session_id: String,
    connection_id: Option<String>,
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
}

impl ChatWidget {
    pub fn new(storage: &mut impl ClientStorage) -> Self {
        ChatWidget {
            session_id: session_id(storage),
            connection_id: None,
            messages: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Records the realtime connection id so outgoing messages exclude it from the echo.
    pub fn set_connection_id(&mut self, connection_id: impl Into<String>) {
        self.connection_id = Some(connection_id.into());
    }

    /// Builds a user message and shows it right away.
    pub fn compose(&mut self, text: impl Into<String>, timezone: Option<String>) -> OutgoingMessage {
        let outgoing = OutgoingMessage {
            id: Uuid::new_v4().to_string(),
            session_id: self.session_id.clone(),
            text: text.into(),
            role: Role::User,
            timezone,
            socket_id: self.connection_id.clone(),
        };

        self.receive(ChatMessage {
            id: outgoing.id.clone(),
            session_id: outgoing.session_id.clone(),
            text: outgoing.text.clone(),
            role: outgoing.role,
            timestamp: Utc::now(),
            timezone: outgoing.timezone.clone(),
        });

        outgoing
    }

    /// Appends an incoming message. Returns `false` if its id was already shown.
    pub fn receive(&mut self, message: ChatMessage) -> bool {
        if message.session_id != self.session_id || !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Merges fetched history, skipping messages already shown. Returns how many were added.
    pub fn load_history(&mut self, history: impl IntoIterator<Item = ChatMessage>) -> usize {
        let added = history
            .into_iter()
            .map(|message| self.receive(message))
            .filter(|added| *added)
            .count();

        if added > 0 {
            self.messages.sort_by_key(|message| message.timestamp);
        }
        added
    }
}
