//! Claude API integration for the storefront assistant.
//!
//! Every chat turn is streamed: [`ClaudeClient::chat_stream`] yields raw
//! Messages API events and [`TurnAssembler`] rebuilds the assistant message
//! from them while the text deltas are forwarded to the visitor.

mod assembler;
mod client;
mod error;
mod types;

pub use assembler::{AssembledMessage, AssemblyStep, TurnAssembler};
pub use client::{ClaudeClient, ModelBackend, ModelStream};
pub use error::{ApiError, ApiErrorResponse, ClaudeError};
pub use types::{
    ChatRequest, ContentBlockDelta, ContentBlockStart, MessageDelta, StopReason, StreamError,
    StreamEvent, StreamMessage, Tool, Usage,
};
