//! Conversation, message and consultation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Title given to conversations created without one.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    /// Raw upstream data the reply was grounded on. Assistant messages only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub context_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatConversation {
    pub id: Uuid,
    pub user_id: String,
    pub clinic_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    pub clinic_id: i64,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ChatConversation> for ConversationSummary {
    fn from(c: &ChatConversation) -> Self {
        Self {
            id: c.id,
            title: c.title.clone(),
            clinic_id: c.clinic_id,
            message_count: c.messages.len(),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

// ─── Requests / responses ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(default, alias = "centroId")]
    pub clinic_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default, alias = "centroId")]
    pub clinic_id: Option<i64>,
    /// UI location the user is looking at, echoed into the context report.
    #[serde(default)]
    pub current_page: Option<String>,
    /// Bearer token forwarded to the analytics API.
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ChatMessage> for MessageView {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id,
            role: m.role,
            content: m.content.clone(),
            created_at: m.created_at,
        }
    }
}

/// A conversation with its messages, without the stored context snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub id: Uuid,
    pub title: String,
    pub clinic_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<MessageView>,
}

impl From<&ChatConversation> for ConversationDetail {
    fn from(c: &ChatConversation) -> Self {
        Self {
            id: c.id,
            title: c.title.clone(),
            clinic_id: c.clinic_id,
            created_at: c.created_at,
            updated_at: c.updated_at,
            messages: c.messages.iter().map(MessageView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResult {
    pub conversation_id: Uuid,
    pub message: MessageView,
}

/// Context handed to the model on each turn. Recomputed every time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub report: String,
    pub raw_data: serde_json::Value,
}

// ─── Inter-agent consultation ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConsultRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub caller: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ConsultResponse {
    pub answer: String,
    pub confidence: f32,
    pub caveats: Vec<String>,
    pub domain: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_accepts_wire_names() {
        let req: SendMessageRequest = serde_json::from_value(serde_json::json!({
            "message": "How is revenue?",
            "centroId": 7,
            "currentPage": "/dashboard",
            "authToken": "tok"
        }))
        .unwrap();
        assert_eq!(req.clinic_id, Some(7));
        assert_eq!(req.current_page.as_deref(), Some("/dashboard"));
        assert!(req.conversation_id.is_none());
    }

    #[test]
    fn test_context_data_omitted_when_absent() {
        let msg = ChatMessage {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: "hi".into(),
            context_data: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("contextData").is_none());
        assert_eq!(json["role"], "user");
    }
}
