//! Request and response bodies of the chat HTTP API.

use serde::{Deserialize, Serialize};

use super::id::ConversationId;
use super::message::StoredMessage;

/// Prompt type used when the caller does not name one.
pub const DEFAULT_PROMPT_TYPE: &str = "standardAssistant";

fn default_prompt_type() -> String {
    DEFAULT_PROMPT_TYPE.to_string()
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The visitor's utterance.
    pub message: String,
    /// Conversation to continue, `null` to start a new one.
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    /// System prompt variant.
    #[serde(default = "default_prompt_type")]
    pub prompt_type: String,
}

/// Customer authorization state for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// The customer has not finished authorizing yet.
    Pending,
    /// A customer token exists for this conversation.
    Authorized,
}

/// Body returned by `GET /auth/token-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatusResponse {
    /// Current status.
    pub status: TokenStatus,
}

/// Body returned by `GET /chat?history=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Stored messages in append order.
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}
