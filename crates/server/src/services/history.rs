//! In-memory conversation history for one chat turn.

use tracing::error;

use shop_chat_core::{ChatRole, ConversationId, Message, StoredMessage};

use crate::db::MessageStore;

/// Messages sent to the model, kept in sync with the store by best-effort
/// appends.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    conversation_id: ConversationId,
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Empty history for a conversation.
    #[must_use]
    pub const fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
        }
    }

    /// Rebuild history from stored messages.
    #[must_use]
    pub fn from_stored(conversation_id: ConversationId, stored: &[StoredMessage]) -> Self {
        Self {
            conversation_id,
            messages: stored.iter().map(StoredMessage::to_message).collect(),
        }
    }

    /// Conversation this history belongs to.
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append in memory only.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append in memory and persist.
    ///
    /// A failed store write is logged; the in-memory append always happens.
    pub async fn record<S: MessageStore>(&mut self, store: &S, message: Message) {
        let stored = message.content.to_stored();
        let role = message.role;
        self.messages.push(message);

        if let Err(e) = store
            .append_message(&self.conversation_id, role, &stored)
            .await
        {
            error!(
                conversation_id = %self.conversation_id,
                role = %role,
                error = %e,
                "Failed to persist message"
            );
        }
    }

    /// Number of messages with the given role.
    #[must_use]
    pub fn count_role(&self, role: ChatRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use shop_chat_core::{MessageContent, ToolUseId};

    #[tokio::test]
    async fn test_record_persists_json_blocks() {
        let store = MemoryStore::new();
        let id = ConversationId::new("c1");
        let mut history = ConversationHistory::new(id.clone());

        history
            .record(
                &store,
                Message::tool_result(ToolUseId::new("toolu_1"), serde_json::json!("ok")),
            )
            .await;

        let stored = store.get_history(&id).await.expect("history");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, ChatRole::User);
        assert_eq!(
            stored[0].content,
            r#"[{"type":"tool_result","tool_use_id":"toolu_1","content":"ok"}]"#
        );

        let rebuilt = ConversationHistory::from_stored(id, &stored);
        assert_eq!(rebuilt.messages(), history.messages());
    }

    #[test]
    fn test_from_stored_keeps_plain_text() {
        let stored = vec![StoredMessage {
            role: ChatRole::User,
            content: "hello".to_string(),
            created_at: chrono::Utc::now(),
        }];
        let history = ConversationHistory::from_stored(ConversationId::new("c"), &stored);
        assert_eq!(
            history.messages()[0].content,
            MessageContent::Text("hello".to_string())
        );
        assert_eq!(history.count_role(ChatRole::User), 1);
    }
}
