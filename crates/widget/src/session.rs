//! Per-visitor session state shared by the widget components.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shop_chat_core::ConversationId;

/// Identifies one authorization poller; a newer token supersedes older ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollToken(u64);

#[derive(Debug, Default)]
struct SessionContext {
    conversation_id: Option<ConversationId>,
    pending_message: Option<String>,
    poll_token: Option<PollToken>,
    next_token: u64,
}

/// Shared handle to the session context.
///
/// Clones refer to the same session. The lock is never held across an await.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionContext>>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session for a known conversation.
    #[must_use]
    pub fn with_conversation(conversation_id: ConversationId) -> Self {
        let session = Self::new();
        session.set_conversation_id(conversation_id);
        session
    }

    fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Conversation the widget talks in, if the server assigned one.
    #[must_use]
    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.lock().conversation_id.clone()
    }

    pub fn set_conversation_id(&self, conversation_id: ConversationId) {
        self.lock().conversation_id = Some(conversation_id);
    }

    pub fn clear_conversation_id(&self) {
        self.lock().conversation_id = None;
    }

    /// Remember the utterance to replay once the customer has authorized.
    pub fn set_pending_message(&self, message: impl Into<String>) {
        self.lock().pending_message = Some(message.into());
    }

    #[must_use]
    pub fn pending_message(&self) -> Option<String> {
        self.lock().pending_message.clone()
    }

    /// Remove and return the pending utterance.
    pub fn take_pending_message(&self) -> Option<String> {
        self.lock().pending_message.take()
    }

    /// Mint a poll token, superseding any running poller.
    pub fn begin_polling(&self) -> PollToken {
        let mut inner = self.lock();
        inner.next_token += 1;
        let token = PollToken(inner.next_token);
        inner.poll_token = Some(token);
        token
    }

    /// Whether `token` belongs to the current poller.
    #[must_use]
    pub fn is_current_poll(&self, token: PollToken) -> bool {
        self.lock().poll_token == Some(token)
    }

    /// Clear the poll token if it is still `token`.
    pub fn finish_polling(&self, token: PollToken) {
        let mut inner = self.lock();
        if inner.poll_token == Some(token) {
            inner.poll_token = None;
        }
    }

    /// Whether a poller is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.lock().poll_token.is_some()
    }

    /// Forget the conversation, the pending utterance and any poller.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.conversation_id = None;
        inner.pending_message = None;
        inner.poll_token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_supersedes_old() {
        let session = Session::new();
        let first = session.begin_polling();
        let second = session.begin_polling();
        assert!(!session.is_current_poll(first));
        assert!(session.is_current_poll(second));

        // A stale poller finishing must not clear the live one
        session.finish_polling(first);
        assert!(session.is_polling());
        session.finish_polling(second);
        assert!(!session.is_polling());
    }

    #[test]
    fn test_reset_stops_polling() {
        let session = Session::with_conversation(ConversationId::new("c1"));
        session.set_pending_message("where is my order");
        let token = session.begin_polling();

        let shared = session.clone();
        shared.reset();
        assert!(session.conversation_id().is_none());
        assert!(session.pending_message().is_none());
        assert!(!session.is_current_poll(token));
    }
}
