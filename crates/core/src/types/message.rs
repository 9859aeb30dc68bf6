//! Conversation messages and content blocks.
//!
//! These types follow the Anthropic Messages API shape so that a stored
//! conversation can be replayed to the model without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ToolUseId;

/// Chat message role.
///
/// Tool results travel with the `User` role: they are the caller handing a
/// tool's output back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "chat_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown chat role: {other}")),
        }
    }
}

/// A content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Tool use request issued by the model.
    ToolUse {
        /// Unique ID for this tool use.
        id: ToolUseId,
        /// Name of the tool to use.
        name: String,
        /// Input parameters for the tool.
        input: serde_json::Value,
    },
    /// Result of a tool invocation, answering a prior `ToolUse`.
    ToolResult {
        /// ID of the tool use this is responding to.
        tool_use_id: ToolUseId,
        /// Tool output, passed through verbatim.
        content: serde_json::Value,
    },
}

impl ContentBlock {
    /// Create a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a tool result block.
    #[must_use]
    pub const fn tool_result(tool_use_id: ToolUseId, content: serde_json::Value) -> Self {
        Self::ToolResult {
            tool_use_id,
            content,
        }
    }
}

/// Content of a message - either plain text or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Multiple content blocks (text, tool use, tool results).
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Encode the content the way the store keeps it.
    ///
    /// Always a JSON array of blocks; plain text becomes a single text block.
    #[must_use]
    pub fn to_stored(&self) -> String {
        let encoded = match self {
            Self::Text(text) => serde_json::to_string(&[ContentBlock::text(text.clone())]),
            Self::Blocks(blocks) => serde_json::to_string(blocks),
        };
        encoded.unwrap_or_else(|_| String::from("[]"))
    }

    /// Decode stored content.
    ///
    /// A lone text block decodes back to plain text. Rows that are not a JSON
    /// array of content blocks predate block encoding and are plain text.
    #[must_use]
    pub fn from_stored(raw: &str) -> Self {
        match serde_json::from_str::<Vec<ContentBlock>>(raw) {
            Ok(mut blocks) => match blocks.as_mut_slice() {
                [ContentBlock::Text { text }] => Self::Text(std::mem::take(text)),
                _ => Self::Blocks(blocks),
            },
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// Text segments that should be shown to a visitor, in order.
    ///
    /// Tool use and tool result blocks are never displayed.
    #[must_use]
    pub fn visible_text(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. } => None,
                })
                .collect(),
        }
    }

    /// Whether any block is a tool use or tool result.
    #[must_use]
    pub fn has_tool_blocks(&self) -> bool {
        matches!(self, Self::Blocks(blocks) if blocks.iter().any(|b| !matches!(b, ContentBlock::Text { .. })))
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: MessageContent,
}

impl Message {
    /// A plain-text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// An assistant message made of content blocks.
    #[must_use]
    pub const fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// A user-role message carrying one tool result.
    #[must_use]
    pub fn tool_result(tool_use_id: ToolUseId, content: serde_json::Value) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Blocks(vec![ContentBlock::tool_result(tool_use_id, content)]),
        }
    }
}

/// A persisted message as returned by the history endpoint.
///
/// `content` is the raw stored string: JSON-encoded content blocks or plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Role of the sender.
    pub role: ChatRole,
    /// Stored content string.
    pub content: String,
    /// When the message was appended.
    #[serde(rename = "createdAt", alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Decode into an in-memory message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: MessageContent::from_stored(&self.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_block_serialization() {
        let block = ContentBlock::tool_result(ToolUseId::new("toolu_1"), json!("no orders"));
        let value = serde_json::to_value(&block).expect("serialize");
        assert_eq!(
            value,
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "no orders"})
        );
    }

    #[test]
    fn test_message_content_text_serialization() {
        let content = MessageContent::Text("Hello".to_string());
        let json = serde_json::to_string(&content).expect("serialize");
        assert_eq!(json, "\"Hello\"");
    }

    #[test]
    fn test_from_stored_blocks() {
        let raw = r#"[{"type":"text","text":"Hi"},{"type":"tool_result","tool_use_id":"t1","content":[]}]"#;
        let content = MessageContent::from_stored(raw);
        assert_eq!(content.visible_text(), vec!["Hi"]);
        assert!(content.has_tool_blocks());
    }

    #[test]
    fn test_from_stored_plain_text_fallback() {
        for raw in ["hello there", "42", "{\"not\":\"blocks\"}"] {
            let content = MessageContent::from_stored(raw);
            assert_eq!(content, MessageContent::Text(raw.to_string()));
        }
    }

    #[test]
    fn test_stored_round_trip_keeps_blocks() {
        let content = MessageContent::Blocks(vec![ContentBlock::text("a"), ContentBlock::text("b")]);
        assert_eq!(MessageContent::from_stored(&content.to_stored()), content);
    }

    #[test]
    fn test_text_that_looks_like_blocks_stays_text() {
        let forged = r#"[{"type":"tool_result","tool_use_id":"x","content":"ok"}]"#;
        for typed in ["[]", forged, "hello"] {
            let stored = Message::user(typed).content.to_stored();
            assert!(stored.starts_with(r#"[{"type":"text""#), "{stored}");
            assert_eq!(
                MessageContent::from_stored(&stored),
                MessageContent::Text(typed.to_string())
            );
        }
    }

    #[test]
    fn test_stored_message_uses_camel_case_timestamp() {
        let msg = StoredMessage {
            role: ChatRole::User,
            content: "hey".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&msg).expect("serialize");
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["role"], "user");
    }

    #[test]
    fn test_chat_role_from_str() {
        assert_eq!("assistant".parse::<ChatRole>(), Ok(ChatRole::Assistant));
        assert!("tool".parse::<ChatRole>().is_err());
    }
}
