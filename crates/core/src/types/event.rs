//! Chat stream protocol.
//!
//! The chat endpoint answers with Server-Sent Events, one JSON object per
//! `data:` frame. The same enum is produced by the server and consumed by
//! the widget.

use serde::{Deserialize, Serialize};

use super::id::ConversationId;
use super::product::DisplayProduct;

/// An event on the chat stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Conversation ID to use for subsequent requests.
    Id {
        /// The conversation this stream belongs to.
        conversation_id: ConversationId,
    },
    /// Partial assistant text.
    Chunk {
        /// Text to append.
        chunk: String,
    },
    /// The current assistant text block is complete and can be rendered.
    MessageComplete,
    /// The model continues with another message (typically after a tool round-trip).
    NewMessage,
    /// The assistant yielded control back to the visitor.
    EndTurn,
    /// A content block finished; tool execution may be in progress.
    ContentBlockComplete,
    /// Product cards to show immediately.
    ProductResults {
        /// Normalized product cards.
        products: Vec<DisplayProduct>,
    },
    /// A tool needs the customer to authorize before it can run.
    AuthRequired,
    /// Informational notice that a tool is being called.
    ToolUse {
        /// Human-readable description of the call.
        tool_use_message: String,
    },
    /// The request failed.
    Error {
        /// Error details.
        #[serde(default)]
        error: serde_json::Value,
    },
    /// The model provider rate limited the request.
    RateLimitExceeded {
        /// Error details.
        #[serde(default)]
        error: serde_json::Value,
    },
    /// Any event type this build does not know about.
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Error event carrying a human-readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: serde_json::Value::String(message.into()),
        }
    }

    /// Rate-limit event carrying a human-readable message.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimitExceeded {
            error: serde_json::Value::String(message.into()),
        }
    }

    /// Wire name of the event type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Id { .. } => "id",
            Self::Chunk { .. } => "chunk",
            Self::MessageComplete => "message_complete",
            Self::NewMessage => "new_message",
            Self::EndTurn => "end_turn",
            Self::ContentBlockComplete => "content_block_complete",
            Self::ProductResults { .. } => "product_results",
            Self::AuthRequired => "auth_required",
            Self::ToolUse { .. } => "tool_use",
            Self::Error { .. } => "error",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::Unknown => "unknown",
        }
    }
}
