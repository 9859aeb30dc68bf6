//! Reassembles streamed model events into a complete assistant message.

use std::collections::BTreeMap;

use shop_chat_core::{ContentBlock, ToolUseId};

use super::types::{ContentBlockDelta, ContentBlockStart, StopReason, StreamEvent};

/// What a raw stream event means for the visitor-facing stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyStep {
    /// New assistant text.
    TextDelta(String),
    /// A text block finished.
    TextBlockComplete,
    /// Nothing visible happened.
    Nothing,
}

#[derive(Debug)]
enum PartialBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
        json: String,
    },
}

/// The assembled assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledMessage {
    /// Content blocks in index order.
    pub blocks: Vec<ContentBlock>,
    /// Why the model stopped.
    pub stop_reason: Option<StopReason>,
}

impl AssembledMessage {
    /// Tool calls requested by the model, in the order it emitted them.
    pub fn tool_calls(&self) -> impl Iterator<Item = (&ToolUseId, &str, &serde_json::Value)> {
        self.blocks.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some((id, name.as_str(), input)),
            ContentBlock::Text { .. } | ContentBlock::ToolResult { .. } => None,
        })
    }
}

/// Accumulates content blocks of one streamed assistant message.
#[derive(Debug, Default)]
pub struct TurnAssembler {
    blocks: BTreeMap<usize, PartialBlock>,
    stop_reason: Option<StopReason>,
}

impl TurnAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one stream event.
    pub fn apply(&mut self, event: StreamEvent) -> AssemblyStep {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let block = match content_block {
                    ContentBlockStart::Text { text } => PartialBlock::Text(text),
                    ContentBlockStart::ToolUse { id, name, input } => PartialBlock::ToolUse {
                        id,
                        name,
                        input,
                        json: String::new(),
                    },
                };
                self.blocks.insert(index, block);
                AssemblyStep::Nothing
            }
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                ContentBlockDelta::TextDelta { text } => {
                    if let Some(PartialBlock::Text(buf)) = self.blocks.get_mut(&index) {
                        buf.push_str(&text);
                    } else {
                        self.blocks.insert(index, PartialBlock::Text(text.clone()));
                    }
                    AssemblyStep::TextDelta(text)
                }
                ContentBlockDelta::InputJsonDelta { partial_json } => {
                    if let Some(PartialBlock::ToolUse { json, .. }) = self.blocks.get_mut(&index) {
                        json.push_str(&partial_json);
                    }
                    AssemblyStep::Nothing
                }
            },
            StreamEvent::ContentBlockStop { index } => match self.blocks.get(&index) {
                Some(PartialBlock::Text(_)) => AssemblyStep::TextBlockComplete,
                _ => AssemblyStep::Nothing,
            },
            StreamEvent::MessageDelta { delta, .. } => {
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                AssemblyStep::Nothing
            }
            StreamEvent::MessageStart { .. }
            | StreamEvent::MessageStop
            | StreamEvent::Ping
            | StreamEvent::Error { .. } => AssemblyStep::Nothing,
        }
    }

    /// Finish the message.
    ///
    /// Tool inputs whose streamed JSON does not parse fall back to the input
    /// sent at block start (normally `{}`).
    #[must_use]
    pub fn finish(self) -> AssembledMessage {
        let blocks = self
            .blocks
            .into_values()
            .filter_map(|block| match block {
                PartialBlock::Text(text) if text.is_empty() => None,
                PartialBlock::Text(text) => Some(ContentBlock::Text { text }),
                PartialBlock::ToolUse {
                    id,
                    name,
                    input,
                    json,
                } => {
                    let input = if json.trim().is_empty() {
                        input
                    } else {
                        serde_json::from_str(&json).unwrap_or_else(|e| {
                            tracing::warn!(tool = %name, error = %e, "Tool input JSON did not parse");
                            input
                        })
                    };
                    let input = if input.is_null() {
                        serde_json::json!({})
                    } else {
                        input
                    };
                    Some(ContentBlock::ToolUse {
                        id: ToolUseId::new(id),
                        name,
                        input,
                    })
                }
            })
            .collect();

        AssembledMessage {
            blocks,
            stop_reason: self.stop_reason,
        }
    }
}
