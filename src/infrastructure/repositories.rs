//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{Message, SessionSummary, Subscriber};
use crate::infrastructure::error::StorageError;
use crate::infrastructure::traits::{MessageRepository, SubscriberRepository};
use async_trait::async_trait;
use di::{Ref, injectable};
use log::debug;

#[injectable(MessageRepository)]
pub struct DbMessageRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbMessageRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbMessageRepository { connection }
    }
}

#[async_trait]
impl MessageRepository for DbMessageRepository {
    async fn insert_message(&self, message: &Message) -> Result<bool, StorageError> {
        // the primary key makes concurrent saves of the same id resolve in the store
        let result = sqlx::query(
            "INSERT INTO messages (id, session_id, text, role, created_at, timezone) VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(&message.text)
        .bind(message.role)
        .bind(message.created_at)
        .bind(&message.timezone)
        .execute(&**self.connection)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!("message {} already stored, skipping", message.id);
        }
        Ok(inserted)
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, StorageError> {
        Ok(sqlx::query_as(
            "SELECT id, session_id, text, role, created_at, timezone FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&**self.connection)
        .await?)
    }

    async fn list_session_messages(&self, session_id: &str) -> Result<Vec<Message>, StorageError> {
        Ok(sqlx::query_as(
            "SELECT id, session_id, text, role, created_at, timezone FROM messages WHERE session_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(session_id)
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn session_summaries(&self) -> Result<Vec<SessionSummary>, StorageError> {
        Ok(sqlx::query_as(
            r#"
            SELECT session_id, text AS last_message, created_at AS last_activity, message_count
            FROM (
                SELECT session_id, text, created_at, rowid AS seq,
                       COUNT(*) OVER (PARTITION BY session_id) AS message_count,
                       ROW_NUMBER() OVER (PARTITION BY session_id ORDER BY created_at DESC, rowid DESC) AS position
                FROM messages
            )
            WHERE position = 1
            ORDER BY last_activity DESC, seq DESC
            "#,
        )
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn delete_session(&self, session_id: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&**self.connection)
            .await?;
        Ok(result.rows_affected())
    }
}

#[injectable(SubscriberRepository)]
pub struct DbSubscriberRepository {
    connection: Ref<DatabaseConnection>,
}

impl DbSubscriberRepository {
    pub fn new(connection: Ref<DatabaseConnection>) -> Self {
        DbSubscriberRepository { connection }
    }
}

#[async_trait]
impl SubscriberRepository for DbSubscriberRepository {
    async fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO subscribers (id, email, created_at) VALUES (?, ?, ?) ON CONFLICT(email) DO NOTHING",
        )
        .bind(&subscriber.id)
        .bind(&subscriber.email)
        .bind(subscriber.created_at)
        .execute(&**self.connection)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_subscribers(&self) -> Result<Vec<Subscriber>, StorageError> {
        Ok(sqlx::query_as(
            "SELECT id, email, created_at FROM subscribers ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&**self.connection)
        .await?)
    }

    async fn delete_subscriber(&self, id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id)
            .execute(&**self.connection)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
