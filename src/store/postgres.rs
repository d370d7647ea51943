use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use tracing::error;

use crate::errors::AppError;
use crate::models::{Conversation, Message, MessageRole};
use crate::store::ConversationStore;

/// Durable store backed by Postgres. Structured message fields (attachments,
/// quiz data, graph expressions) are stored as JSON text columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: sqlx::postgres::PgRow) -> Result<Message, AppError> {
    let role_str: String = row
        .try_get("role")
        .map_err(|e| AppError::db_query("Failed to read role", e))?;
    let role = MessageRole::try_from(role_str)
        .map_err(|e| AppError::Unexpected(format!("Unknown message role: {e}")))?;

    let attachments: String = row
        .try_get("attachments")
        .map_err(|e| AppError::db_query("Failed to read attachments", e))?;
    let mcqs: String = row
        .try_get("mcqs")
        .map_err(|e| AppError::db_query("Failed to read mcqs", e))?;
    let graph_expressions: String = row
        .try_get("graph_expressions")
        .map_err(|e| AppError::db_query("Failed to read graph_expressions", e))?;

    Ok(Message {
        id: row
            .try_get("id")
            .map_err(|e| AppError::db_query("Failed to read id", e))?,
        conversation_id: row
            .try_get("conversation_id")
            .map_err(|e| AppError::db_query("Failed to read conversation_id", e))?,
        role,
        content: row
            .try_get("content")
            .map_err(|e| AppError::db_query("Failed to read content", e))?,
        attachments: serde_json::from_str(&attachments)
            .map_err(|e| AppError::Unexpected(format!("Corrupt attachments column: {e}")))?,
        mcqs: serde_json::from_str(&mcqs)
            .map_err(|e| AppError::Unexpected(format!("Corrupt mcqs column: {e}")))?,
        graph_expressions: serde_json::from_str(&graph_expressions)
            .map_err(|e| AppError::Unexpected(format!("Corrupt graph_expressions column: {e}")))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| AppError::db_query("Failed to read created_at", e))?,
    })
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn find_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, owner_id, title, created_at, updated_at FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find conversation {id}: {e}");
            AppError::db_query(format!("Failed to find conversation {id}"), e)
        })
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, owner_id, title, created_at, updated_at FROM conversations
             WHERE owner_id = $1 ORDER BY updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch conversations for {owner_id}: {e}");
            AppError::db_query("Failed to fetch conversations", e)
        })
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO conversations (id, owner_id, title, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&conversation.id)
        .bind(&conversation.owner_id)
        .bind(&conversation.title)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save conversation {}: {e}", conversation.id);
            AppError::db_query("Failed to save conversation", e)
        })?;
        Ok(())
    }

    async fn touch_conversation(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE conversations SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to update conversation timestamp {id}: {e}");
                AppError::db_query("Failed to update conversation", e)
            })?;
        Ok(())
    }

    async fn messages_for(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, attachments, mcqs, graph_expressions, created_at
             FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch messages for conversation {conversation_id}: {e}");
            AppError::db_query(
                format!("Failed to fetch messages for conversation {conversation_id}"),
                e,
            )
        })?;

        rows.into_iter().map(row_to_message).collect()
    }

    async fn save_message(&self, message: &Message) -> Result<(), AppError> {
        let attachments = serde_json::to_string(&message.attachments)
            .map_err(|e| AppError::Unexpected(e.to_string()))?;
        let mcqs = serde_json::to_string(&message.mcqs)
            .map_err(|e| AppError::Unexpected(e.to_string()))?;
        let graph_expressions = serde_json::to_string(&message.graph_expressions)
            .map_err(|e| AppError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, attachments, mcqs, graph_expressions, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(attachments)
        .bind(mcqs)
        .bind(graph_expressions)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save message {}: {e}", message.id);
            AppError::db_query("Failed to save message", e)
        })?;
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete conversation {id}: {e}");
                AppError::db_query("Failed to delete conversation", e)
            })?;
        Ok(())
    }
}
