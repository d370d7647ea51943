use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Conversation, Message};
use crate::store::ConversationStore;

struct Entry {
    conversation: Conversation,
    messages: Vec<Message>,
}

/// Keyed in-memory store. Used by tests and when no `DATABASE_URL` is set.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries.get(id).map(|e| e.conversation.clone()))
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, AppError> {
        let entries = self.entries.read().await;
        let mut conversations: Vec<Conversation> = entries
            .values()
            .map(|e| e.conversation.clone())
            .filter(|c| c.owner_id == owner_id)
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            conversation.id.clone(),
            Entry { conversation: conversation.clone(), messages: Vec::new() },
        );
        Ok(())
    }

    async fn touch_conversation(&self, id: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.conversation.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn messages_for(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(conversation_id)
            .map(|e| e.messages.clone())
            .unwrap_or_default())
    }

    async fn save_message(&self, message: &Message) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&message.conversation_id)
            .ok_or_else(|| AppError::ConversationNotFound { id: message.conversation_id.clone() })?;
        entry.messages.push(message.clone());
        Ok(())
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        entries.remove(id);
        Ok(())
    }
}
