//! Restoring a conversation when the widget opens.

use tracing::{info, warn};

use shop_chat_core::{ChatRole, MessageContent};

use crate::ports::{ChatBackend, Presenter};
use crate::session::Session;

/// What the widget found when it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The session has no conversation yet.
    NoConversation,
    /// The conversation exists but has no messages; the welcome was shown.
    Empty,
    /// This many bubbles were rendered.
    Restored(usize),
    /// History could not be loaded; the welcome was shown and the conversation forgotten.
    Failed,
}

/// Render the stored messages of the session's conversation.
///
/// Only text is shown. Tool calls and tool results stay hidden.
pub async fn restore_history<B, P>(
    backend: &B,
    presenter: &P,
    session: &Session,
    welcome_message: &str,
) -> RestoreOutcome
where
    B: ChatBackend,
    P: Presenter,
{
    let Some(conversation_id) = session.conversation_id() else {
        return RestoreOutcome::NoConversation;
    };

    let messages = match backend.history(&conversation_id).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!(conversation_id = %conversation_id, error = %e, "Failed to load chat history");
            presenter.render_message(ChatRole::Assistant, welcome_message);
            session.clear_conversation_id();
            return RestoreOutcome::Failed;
        }
    };

    if messages.is_empty() {
        presenter.render_message(ChatRole::Assistant, welcome_message);
        return RestoreOutcome::Empty;
    }

    let mut rendered = 0;
    for message in &messages {
        let content = MessageContent::from_stored(&message.content);
        for text in content.visible_text() {
            presenter.render_message(message.role, text);
            rendered += 1;
        }
    }
    info!(
        conversation_id = %conversation_id,
        stored = messages.len(),
        rendered,
        "Chat history restored"
    );
    RestoreOutcome::Restored(rendered)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testing::{RecordingPresenter, ScriptedBackend};
    use shop_chat_core::{ConversationId, StoredMessage};

    fn stored(role: ChatRole, content: &str) -> StoredMessage {
        StoredMessage {
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tool_blocks_are_hidden() {
        let backend = ScriptedBackend::new();
        backend.set_history(Some(vec![
            stored(ChatRole::User, "do you have rings?"),
            stored(
                ChatRole::Assistant,
                r#"[{"type":"text","text":"Let me look."},{"type":"tool_use","id":"toolu_1","name":"search_shop_catalog","input":{}}]"#,
            ),
            stored(
                ChatRole::User,
                r#"[{"type":"tool_result","tool_use_id":"toolu_1","content":"[]"}]"#,
            ),
            stored(ChatRole::Assistant, r#"[{"type":"text","text":"Here you go."}]"#),
        ]));
        let presenter = RecordingPresenter::default();
        let session = Session::with_conversation(ConversationId::new("conv-1"));

        let outcome = restore_history(&backend, &presenter, &session, "welcome").await;

        assert_eq!(outcome, RestoreOutcome::Restored(3));
        assert_eq!(
            presenter.messages(),
            vec![
                (ChatRole::User, "do you have rings?".to_string()),
                (ChatRole::Assistant, "Let me look.".to_string()),
                (ChatRole::Assistant, "Here you go.".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_shows_welcome_and_forgets_conversation() {
        let backend = ScriptedBackend::new();
        backend.set_history(None);
        let presenter = RecordingPresenter::default();
        let session = Session::with_conversation(ConversationId::new("gone"));

        let outcome = restore_history(&backend, &presenter, &session, "welcome").await;

        assert_eq!(outcome, RestoreOutcome::Failed);
        assert_eq!(presenter.assistant_messages(), vec!["welcome".to_string()]);
        assert!(session.conversation_id().is_none());
    }

    #[tokio::test]
    async fn test_empty_history_shows_welcome() {
        let backend = ScriptedBackend::new();
        let presenter = RecordingPresenter::default();
        let session = Session::with_conversation(ConversationId::new("new"));

        let outcome = restore_history(&backend, &presenter, &session, "welcome").await;
        assert_eq!(outcome, RestoreOutcome::Empty);
        assert_eq!(session.conversation_id(), Some(ConversationId::new("new")));
    }
}
