//! One chat turn: persist, assemble context, complete, persist reply.

use crate::completion::{CompletionClient, CompletionMessage};
use crate::context::ContextAssembler;
use crate::prompt::system_message;
use crate::store::ConversationStore;
use cfo_core::chat::{ChatMessage, ChatRole, MessageView, SendMessageRequest, SendMessageResult};
use cfo_core::config::ChatConfig;
use cfo_core::{CfoError, CfoResult};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    context: ContextAssembler,
    completion: Arc<dyn CompletionClient>,
    config: ChatConfig,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        context: ContextAssembler,
        completion: Arc<dyn CompletionClient>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            context,
            completion,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Run one turn for `owner`. Input, ownership and lookup failures come
    /// back as-is; storage and completion failures are returned unchanged for
    /// the caller to log and collapse.
    pub async fn send(&self, owner: &str, request: SendMessageRequest) -> CfoResult<SendMessageResult> {
        let text = request.message.trim().to_string();
        if text.is_empty() {
            return Err(CfoError::InvalidInput("message is required".to_string()));
        }
        let clinic_id = request
            .clinic_id
            .ok_or_else(|| CfoError::InvalidInput("centroId is required".to_string()))?;

        let conversation = match request.conversation_id.as_deref() {
            Some(raw) => {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| CfoError::InvalidInput(format!("invalid conversation id: {raw}")))?;
                self.store
                    .get(owner, id)
                    .await?
                    .ok_or_else(|| CfoError::NotFound("conversation not found".to_string()))?
            }
            None => {
                let title = self.title_from(&text);
                self.store.create(owner, clinic_id, Some(title)).await?
            }
        };
        let history = conversation.messages;
        let was_empty = history.is_empty();

        self.store
            .append_message(conversation.id, ChatRole::User, text.clone(), None)
            .await?;

        let context = self
            .context
            .build(
                clinic_id,
                request.auth_token.as_deref(),
                request.current_page.as_deref(),
            )
            .await;

        let messages = self.completion_messages(&context.report, &history, &text);
        let reply = self.completion.complete(&messages).await?;

        let stored = self
            .store
            .append_message(
                conversation.id,
                ChatRole::Assistant,
                reply,
                Some(context.raw_data),
            )
            .await?;

        if was_empty {
            self.store
                .set_title(conversation.id, self.title_from(&text))
                .await?;
        }

        metrics::counter!("chat.turns").increment(1);
        info!(
            conversation_id = %conversation.id,
            clinic_id,
            history = history.len(),
            "Chat turn complete"
        );

        Ok(SendMessageResult {
            conversation_id: conversation.id,
            message: MessageView::from(&stored),
        })
    }

    fn title_from(&self, text: &str) -> String {
        text.chars().take(self.config.title_max_chars).collect()
    }

    fn completion_messages(
        &self,
        report: &str,
        history: &[ChatMessage],
        text: &str,
    ) -> Vec<CompletionMessage> {
        let recent = &history[history.len().saturating_sub(self.config.max_history)..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(CompletionMessage::system(system_message(report)));
        messages.extend(recent.iter().map(|m| match m.role {
            ChatRole::User => CompletionMessage::user(m.content.clone()),
            ChatRole::Assistant => CompletionMessage::assistant(m.content.clone()),
        }));
        messages.push(CompletionMessage::user(text));
        messages
    }
}
