//! Seams between the widget engine and its surroundings.
//!
//! [`Presenter`] renders; [`ChatBackend`] talks to the chat server.

use std::future::Future;

use futures::stream::BoxStream;

use shop_chat_core::{
    ChatRequest, ChatRole, ConversationId, DisplayProduct, StoredMessage, TokenStatus,
};

use crate::error::WidgetError;
use crate::flow::QuickReply;

/// Raw body of a streamed chat response.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, WidgetError>>;

/// Rendering surface of the widget.
///
/// Calls arrive in the order they must appear. Busy indicator calls may
/// repeat; implementations treat them as idempotent.
pub trait Presenter: Send + Sync {
    /// Append a chat bubble.
    fn render_message(&self, role: ChatRole, text: &str);

    /// Show the typing indicator.
    fn show_busy(&self);

    /// Hide the typing indicator.
    fn hide_busy(&self);

    /// Show product cards.
    fn show_products(&self, products: &[DisplayProduct]);

    /// Open the out-of-band customer authorization surface.
    fn open_authorization(&self);

    /// Show the flow starters.
    fn show_starters(&self, starters: &[QuickReply]);

    /// Remove the flow starters.
    fn hide_starters(&self);

    /// Show quick replies under the latest message.
    fn show_quick_replies(&self, replies: &[QuickReply]);

    /// Remove the quick replies.
    fn clear_quick_replies(&self);
}

/// Chat server API used by the widget.
pub trait ChatBackend: Send + Sync {
    /// Start a chat turn; the body is an SSE stream.
    fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ByteStream, WidgetError>> + Send;

    /// Customer authorization status of a conversation.
    fn token_status(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<TokenStatus, WidgetError>> + Send;

    /// Stored messages of a conversation.
    fn history(
        &self,
        conversation_id: &ConversationId,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, WidgetError>> + Send;
}
