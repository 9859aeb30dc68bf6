//! Tool-augmented chat turn.
//!
//! One visitor message drives this flow inside a single stream:
//! 1. Announce the conversation ID
//! 2. Load stored history and append the visitor message
//! 3. Stream the model's answer, forwarding text as it arrives
//! 4. Execute requested tools in order and route their results
//! 5. Loop until the model answers without tools
//! 6. Send the collected product cards

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{error, info, warn};

use shop_chat_core::{
    ChatRole, ConversationId, DEFAULT_PROMPT_TYPE, DisplayProduct, Message, StreamEvent,
};

use crate::claude::{AssemblyStep, ClaudeError, ModelBackend, TurnAssembler};
use crate::db::MessageStore;
use crate::mcp::ToolInvoker;

use super::history::ConversationHistory;
use super::prompts::system_prompt;
use super::tool::{RouteSignal, ToolResultRouter};

/// Maximum number of tool use iterations to prevent infinite loops.
pub const MAX_TOOL_ITERATIONS: usize = 10;

const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";
const TURN_FAILED_MESSAGE: &str = "Failed to get a response. Please try again later.";

/// Errors that end a chat turn early.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Claude API error.
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),

    /// Too many tool iterations (possible infinite loop).
    #[error("too many tool iterations")]
    TooManyToolIterations,
}

impl ChatError {
    /// The stream event that reports this error to the widget.
    #[must_use]
    pub fn to_event(&self) -> StreamEvent {
        match self {
            Self::Claude(e) if e.is_rate_limit() => StreamEvent::rate_limited(RATE_LIMIT_MESSAGE),
            // Upstream details stay in the logs and Sentry
            _ => StreamEvent::error(TURN_FAILED_MESSAGE),
        }
    }

    fn report(&self) {
        if matches!(self, Self::Claude(e) if e.is_rate_limit()) {
            warn!(error = %self, "Chat turn rate limited");
        } else {
            let event_id = sentry::capture_error(self);
            error!(error = %self, sentry_event_id = %event_id, "Chat turn failed");
        }
    }
}

/// Input of one chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    /// The visitor's message.
    pub message: String,
    /// Conversation to continue; a new one is minted when absent.
    pub conversation_id: Option<ConversationId>,
    /// System prompt variant.
    pub prompt_type: String,
    /// Store name used in the system prompt.
    pub shop_name: String,
}

impl ChatTurnRequest {
    /// A request for a new conversation with the default prompt.
    #[must_use]
    pub fn new(message: impl Into<String>, shop_name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            prompt_type: DEFAULT_PROMPT_TYPE.to_string(),
            shop_name: shop_name.into(),
        }
    }
}

/// Run one chat turn as a stream of protocol events.
///
/// The stream always starts with an `id` event. Model failures end it with
/// `error` or `rate_limit_exceeded`; store failures are logged and never end
/// it.
pub fn stream_chat_turn<M, T, S>(
    model: M,
    tools: T,
    store: S,
    router: ToolResultRouter,
    request: ChatTurnRequest,
) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    M: ModelBackend + 'static,
    T: ToolInvoker + 'static,
    S: MessageStore + 'static,
{
    stream! {
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(ConversationId::generate);
        yield StreamEvent::Id {
            conversation_id: conversation_id.clone(),
        };

        let stored = match store.get_history(&conversation_id).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(conversation_id = %conversation_id, error = %e, "Failed to load history");
                Vec::new()
            }
        };
        let mut history = ConversationHistory::from_stored(conversation_id.clone(), &stored);
        history.record(&store, Message::user(request.message.clone())).await;

        let available_tools = match tools.list_tools().await {
            Ok(list) if !list.is_empty() => Some(list),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Tool list unavailable, continuing without tools");
                None
            }
        };
        let system = system_prompt(&request.prompt_type, &request.shop_name);

        info!(
            conversation_id = %conversation_id,
            history_len = history.len(),
            tool_count = available_tools.as_ref().map_or(0, Vec::len),
            "Starting chat turn"
        );

        let mut products: Vec<DisplayProduct> = Vec::new();
        let mut finished = false;

        for iteration in 1..=MAX_TOOL_ITERATIONS {
            let mut events = match model
                .stream_message(history.messages().to_vec(), Some(system.clone()), available_tools.clone())
                .await
            {
                Ok(events) => events,
                Err(e) => {
                    let err = ChatError::from(e);
                    err.report();
                    yield err.to_event();
                    return;
                }
            };

            let mut assembler = TurnAssembler::new();
            while let Some(event) = events.next().await {
                match event {
                    Ok(event) => match assembler.apply(event) {
                        AssemblyStep::TextDelta(chunk) => {
                            yield StreamEvent::Chunk { chunk };
                        }
                        AssemblyStep::TextBlockComplete => {
                            yield StreamEvent::ContentBlockComplete;
                        }
                        AssemblyStep::Nothing => {}
                    },
                    Err(e) => {
                        let err = ChatError::from(e);
                        err.report();
                        yield err.to_event();
                        return;
                    }
                }
            }

            let message = assembler.finish();
            yield StreamEvent::MessageComplete;

            let calls: Vec<_> = message
                .tool_calls()
                .map(|(id, name, input)| (id.clone(), name.to_string(), input.clone()))
                .collect();
            info!(
                iteration,
                stop_reason = ?message.stop_reason,
                tool_calls = calls.len(),
                "Model message complete"
            );

            if !message.blocks.is_empty() {
                history.record(&store, Message::assistant_blocks(message.blocks)).await;
            }

            if calls.is_empty() {
                yield StreamEvent::EndTurn;
                finished = true;
                break;
            }

            for (tool_use_id, name, input) in calls {
                yield StreamEvent::ToolUse {
                    tool_use_message: format!("Calling tool: {name} with arguments: {input}"),
                };

                let outcome = tools.invoke(&tool_use_id, &name, &input).await;
                let signal = router
                    .route(outcome, &input, &mut history, &mut products, &store)
                    .await;
                if signal == RouteSignal::AuthRequired {
                    yield StreamEvent::AuthRequired;
                }

                yield StreamEvent::NewMessage;
            }
        }

        if !finished {
            let err = ChatError::TooManyToolIterations;
            err.report();
            yield err.to_event();
            return;
        }

        if !products.is_empty() {
            info!(count = products.len(), "Sending product results");
            yield StreamEvent::ProductResults { products };
        }

        info!(
            conversation_id = %conversation_id,
            assistant_messages = history.count_role(ChatRole::Assistant),
            "Chat turn finished"
        );
    }
}
