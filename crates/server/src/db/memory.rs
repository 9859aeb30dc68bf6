//! Process-local conversation store.
//!
//! Used when no database is configured and by tests. Contents are lost on
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use shop_chat_core::{ChatRole, ConversationId, StoredMessage};

use super::{ConversationSummary, CustomerToken, MessageStore, RepositoryError};

#[derive(Debug)]
struct ConversationEntry {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    messages: Vec<StoredMessage>,
}

impl ConversationEntry {
    fn summary(&self, id: &ConversationId) -> ConversationSummary {
        ConversationSummary {
            id: id.clone(),
            message_count: i64::try_from(self.messages.len()).unwrap_or(i64::MAX),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    conversations: HashMap<ConversationId, ConversationEntry>,
    tokens: HashMap<ConversationId, CustomerToken>,
}

/// In-memory [`MessageStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for MemoryStore {
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        role: ChatRole,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        let now = Utc::now();
        let message = StoredMessage {
            role,
            content: content.to_string(),
            created_at: now,
        };

        let mut inner = self.inner.write().await;
        let entry = inner
            .conversations
            .entry(conversation_id.clone())
            .or_insert_with(|| ConversationEntry {
                created_at: now,
                updated_at: now,
                messages: Vec::new(),
            });
        entry.updated_at = now;
        entry.messages.push(message.clone());

        Ok(message)
    }

    async fn get_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .conversations
            .get(conversation_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default())
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<ConversationSummary>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .conversations
            .get(conversation_id)
            .map(|entry| entry.summary(conversation_id)))
    }

    async fn list_conversations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut summaries: Vec<ConversationSummary> = inner
            .conversations
            .iter()
            .map(|(id, entry)| entry.summary(id))
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(summaries.into_iter().skip(skip).take(take).collect())
    }

    async fn count_conversations(&self) -> Result<i64, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(i64::try_from(inner.conversations.len()).unwrap_or(i64::MAX))
    }

    async fn customer_token(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<CustomerToken>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.tokens.get(conversation_id).cloned())
    }

    async fn store_customer_token(
        &self,
        conversation_id: &ConversationId,
        token: &CustomerToken,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.tokens.insert(conversation_id.clone(), token.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_creates_conversation_lazily() {
        let store = MemoryStore::new();
        let id = ConversationId::new("c1");
        assert!(store.get_conversation(&id).await.expect("get").is_none());
        assert!(store.get_history(&id).await.expect("history").is_empty());

        store
            .append_message(&id, ChatRole::User, "hello")
            .await
            .expect("append");
        store
            .append_message(&id, ChatRole::Assistant, r#"[{"type":"text","text":"hi"}]"#)
            .await
            .expect("append");

        let history = store.get_history(&id).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[1].role, ChatRole::Assistant);

        let summary = store
            .get_conversation(&id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(summary.message_count, 2);
    }

    #[tokio::test]
    async fn test_list_conversations_pages() {
        let store = MemoryStore::new();
        for n in 0..5 {
            let id = ConversationId::new(format!("c{n}"));
            store
                .append_message(&id, ChatRole::User, "hi")
                .await
                .expect("append");
        }

        assert_eq!(store.count_conversations().await.expect("count"), 5);
        let first = store.list_conversations(2, 0).await.expect("list");
        let last = store.list_conversations(2, 4).await.expect("list");
        assert_eq!(first.len(), 2);
        assert_eq!(last.len(), 1);
        assert!(first[0].updated_at >= first[1].updated_at);
    }
}
