pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Conversation, Message};

/// Persistence boundary for conversations. The in-memory implementation backs
/// tests and database-less deployments; Postgres backs production.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError>;

    /// Conversations owned by `owner_id`, most recently updated first.
    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, AppError>;

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), AppError>;

    async fn touch_conversation(&self, id: &str) -> Result<(), AppError>;

    /// Messages in chronological (append) order.
    async fn messages_for(&self, conversation_id: &str) -> Result<Vec<Message>, AppError>;

    async fn save_message(&self, message: &Message) -> Result<(), AppError>;

    /// Removes the conversation and its messages. Ownership is checked by the
    /// service layer before this is called.
    async fn delete_conversation(&self, id: &str) -> Result<(), AppError>;
}
