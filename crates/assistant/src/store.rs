//! Conversation persistence, always scoped to the owning user.

use async_trait::async_trait;
use cfo_core::chat::{
    ChatConversation, ChatMessage, ChatRole, ConversationSummary, DEFAULT_CONVERSATION_TITLE,
};
use cfo_core::{CfoError, CfoResult};
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Most conversations returned by a single listing.
pub const LIST_LIMIT: usize = 50;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(
        &self,
        owner: &str,
        clinic_id: i64,
        title: Option<String>,
    ) -> CfoResult<ChatConversation>;

    /// Most recently updated first, at most [`LIST_LIMIT`].
    async fn list(&self, owner: &str, clinic_id: Option<i64>) -> CfoResult<Vec<ConversationSummary>>;

    /// `None` when the conversation does not exist or belongs to someone else.
    async fn get(&self, owner: &str, id: Uuid) -> CfoResult<Option<ChatConversation>>;

    /// Removes the conversation and all its messages. `false` when nothing
    /// owned by `owner` matched.
    async fn delete(&self, owner: &str, id: Uuid) -> CfoResult<bool>;

    async fn append_message(
        &self,
        id: Uuid,
        role: ChatRole,
        content: String,
        context_data: Option<Value>,
    ) -> CfoResult<ChatMessage>;

    async fn set_title(&self, id: Uuid, title: String) -> CfoResult<()>;
}

/// Development store. Messages live inside their conversation record, so
/// deleting the record removes them in the same step.
pub struct InMemoryConversationStore {
    conversations: DashMap<Uuid, ChatConversation>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        info!("In-memory conversation store initialized");
        Self {
            conversations: DashMap::new(),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create(
        &self,
        owner: &str,
        clinic_id: i64,
        title: Option<String>,
    ) -> CfoResult<ChatConversation> {
        let now = Utc::now();
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_CONVERSATION_TITLE.to_string());

        let conversation = ChatConversation {
            id: Uuid::new_v4(),
            user_id: owner.to_string(),
            clinic_id,
            title,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        };
        self.conversations
            .insert(conversation.id, conversation.clone());
        debug!(conversation_id = %conversation.id, clinic_id, "Conversation created");
        Ok(conversation)
    }

    async fn list(&self, owner: &str, clinic_id: Option<i64>) -> CfoResult<Vec<ConversationSummary>> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .filter(|c| c.user_id == owner && clinic_id.map_or(true, |id| c.clinic_id == id))
            .map(|c| ConversationSummary::from(c.value()))
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries.truncate(LIST_LIMIT);
        Ok(summaries)
    }

    async fn get(&self, owner: &str, id: Uuid) -> CfoResult<Option<ChatConversation>> {
        Ok(self
            .conversations
            .get(&id)
            .filter(|c| c.user_id == owner)
            .map(|c| c.clone()))
    }

    async fn delete(&self, owner: &str, id: Uuid) -> CfoResult<bool> {
        let removed = self
            .conversations
            .remove_if(&id, |_, c| c.user_id == owner)
            .is_some();
        if removed {
            info!(conversation_id = %id, "Conversation deleted");
        }
        Ok(removed)
    }

    async fn append_message(
        &self,
        id: Uuid,
        role: ChatRole,
        content: String,
        context_data: Option<Value>,
    ) -> CfoResult<ChatMessage> {
        let mut conversation = self
            .conversations
            .get_mut(&id)
            .ok_or_else(|| CfoError::Storage(format!("conversation {id} does not exist")))?;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            role,
            content,
            context_data,
            created_at: Utc::now(),
        };
        conversation.messages.push(message.clone());
        conversation.updated_at = message.created_at;
        Ok(message)
    }

    async fn set_title(&self, id: Uuid, title: String) -> CfoResult<()> {
        let mut conversation = self
            .conversations
            .get_mut(&id)
            .ok_or_else(|| CfoError::Storage(format!("conversation {id} does not exist")))?;
        conversation.title = title;
        conversation.updated_at = Utc::now();
        Ok(())
    }
}
