//! Chat services: the turn loop and the pieces it is built from.

pub mod chat;
pub mod history;
pub mod products;
pub mod prompts;
pub mod tool;

pub use chat::{ChatError, ChatTurnRequest, MAX_TOOL_ITERATIONS, stream_chat_turn};
pub use history::ConversationHistory;
pub use products::{Availability, CatalogProduct, VariantFilter, extract_variant_filters, normalize};
pub use prompts::{ENTHUSIASTIC_PROMPT_TYPE, system_prompt};
pub use tool::{RouteSignal, ToolFailure, ToolInvocationOutcome, ToolResultRouter};
