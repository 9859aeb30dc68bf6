//! Integration tests for Shop Chat.
//!
//! The helpers here wire the widget engine to the real chat turn loop with
//! no network model involved:
//!
//! - [`ScriptedModel`] replays canned model messages
//! - [`ScriptedTools`] answers tool calls, optionally requiring a customer
//! - [`InProcessBackend`] runs each chat turn in-process and hands the widget
//!   the SSE bytes the server would send
//! - [`spawn_server`] serves the real router on an ephemeral port
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shop-chat-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use shop_chat_core::{ChatRequest, ConversationId, Message, StoredMessage, TokenStatus, ToolUseId};
use shop_chat_server::claude::{
    ClaudeClient, ClaudeError, ContentBlockDelta, ContentBlockStart, MessageDelta, ModelBackend,
    ModelStream, StopReason, StreamEvent as ModelEvent, Tool, Usage,
};
use shop_chat_server::config::{ClaudeConfig, McpConfig, ServerConfig};
use shop_chat_server::db::{CustomerToken, MemoryStore, MessageStore, Store};
use shop_chat_server::mcp::{AUTH_REQUIRED_MESSAGE, McpClient, McpError, ToolInvoker};
use shop_chat_server::routes;
use shop_chat_server::services::{
    ChatTurnRequest, ToolInvocationOutcome, ToolResultRouter, stream_chat_turn,
};
use shop_chat_server::state::AppState;
use shop_chat_widget::testing::sse_frame;
use shop_chat_widget::{ByteStream, ChatBackend, WidgetError};

/// Name of the catalog search tool used throughout the tests.
pub const SEARCH_TOOL: &str = "search_shop_catalog";

/// Product cards kept per turn in the tests.
pub const MAX_PRODUCTS: usize = 3;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Model
// ============================================================================

/// Raw events of an assistant message that streams `parts` as one text block.
#[must_use]
pub fn text_message(parts: &[&str]) -> Vec<ModelEvent> {
    let mut events = vec![ModelEvent::ContentBlockStart {
        index: 0,
        content_block: ContentBlockStart::Text {
            text: String::new(),
        },
    }];
    events.extend(parts.iter().map(|part| ModelEvent::ContentBlockDelta {
        index: 0,
        delta: ContentBlockDelta::TextDelta {
            text: (*part).to_string(),
        },
    }));
    events.push(ModelEvent::ContentBlockStop { index: 0 });
    events.push(stop(StopReason::EndTurn));
    events.push(ModelEvent::MessageStop);
    events
}

/// Raw events of an assistant message that optionally says `preamble` and
/// then calls `name` with `input`.
#[must_use]
pub fn tool_use_message(
    preamble: Option<&str>,
    tool_use_id: &str,
    name: &str,
    input: &Value,
) -> Vec<ModelEvent> {
    let mut events = Vec::new();
    let mut index = 0;
    if let Some(text) = preamble {
        events.push(ModelEvent::ContentBlockStart {
            index,
            content_block: ContentBlockStart::Text {
                text: String::new(),
            },
        });
        events.push(ModelEvent::ContentBlockDelta {
            index,
            delta: ContentBlockDelta::TextDelta {
                text: text.to_string(),
            },
        });
        events.push(ModelEvent::ContentBlockStop { index });
        index += 1;
    }
    events.push(ModelEvent::ContentBlockStart {
        index,
        content_block: ContentBlockStart::ToolUse {
            id: tool_use_id.to_string(),
            name: name.to_string(),
            input: json!({}),
        },
    });
    events.push(ModelEvent::ContentBlockDelta {
        index,
        delta: ContentBlockDelta::InputJsonDelta {
            partial_json: input.to_string(),
        },
    });
    events.push(ModelEvent::ContentBlockStop { index });
    events.push(stop(StopReason::ToolUse));
    events.push(ModelEvent::MessageStop);
    events
}

fn stop(reason: StopReason) -> ModelEvent {
    ModelEvent::MessageDelta {
        delta: MessageDelta {
            stop_reason: Some(reason),
        },
        usage: Usage::default(),
    }
}

/// One scripted answer of the model.
#[derive(Debug)]
pub enum ModelReply {
    /// Stream these events.
    Message(Vec<ModelEvent>),
    /// Refuse the request before streaming.
    Refused(ClaudeError),
    /// Stream these events, then fail.
    Broken(Vec<ModelEvent>, ClaudeError),
}

/// What the turn loop sent to the model.
#[derive(Debug, Clone)]
pub struct ModelCall {
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// System prompt.
    pub system: Option<String>,
    /// Names of the offered tools.
    pub tool_names: Vec<String>,
}

#[derive(Debug, Default)]
struct ScriptedModelInner {
    replies: Mutex<VecDeque<ModelReply>>,
    calls: Mutex<Vec<ModelCall>>,
}

/// A model that replays canned replies in order.
///
/// Clones share the script. A request past the end of the script fails with
/// a stream error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModel {
    inner: Arc<ScriptedModelInner>,
}

impl ScriptedModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push(&self, reply: ModelReply) {
        lock(&self.inner.replies).push_back(reply);
    }

    /// Queue a streamed message.
    pub fn push_message(&self, events: Vec<ModelEvent>) {
        self.push(ModelReply::Message(events));
    }

    /// Requests received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ModelCall> {
        lock(&self.inner.calls).clone()
    }

    /// Replies not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        lock(&self.inner.replies).len()
    }
}

impl ModelBackend for ScriptedModel {
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> Result<ModelStream, ClaudeError> {
        lock(&self.inner.calls).push(ModelCall {
            messages,
            system,
            tool_names: tools
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.name)
                .collect(),
        });

        let reply = lock(&self.inner.replies).pop_front();
        match reply {
            Some(ModelReply::Message(events)) => {
                Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
            }
            Some(ModelReply::Broken(events, error)) => Ok(futures::stream::iter(
                events
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error))),
            )
            .boxed()),
            Some(ModelReply::Refused(error)) => Err(error),
            None => Err(ClaudeError::Stream("no scripted reply left".to_string())),
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

/// Search result content wrapping `products` the way the catalog returns it.
#[must_use]
pub fn search_result(products: &Value) -> Value {
    json!([{ "type": "text", "text": json!({ "products": products }).to_string() }])
}

/// One scripted tool answer.
#[derive(Debug, Clone)]
pub enum ToolAnswer {
    /// Succeed with this content.
    Content(Value),
    /// Fail with this error message.
    Failed(String),
}

/// A tool call seen by [`ScriptedTools`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
    /// Whether the call carried customer credentials.
    pub authorized: bool,
}

#[derive(Debug, Default)]
struct ScriptedToolsInner {
    tools: Vec<Tool>,
    customer_scoped: HashSet<String>,
    answers: Mutex<HashMap<String, VecDeque<ToolAnswer>>>,
    calls: Mutex<Vec<ToolCall>>,
}

/// Tools answered from a script.
///
/// Customer-scoped tools report `auth_required` until invoked through
/// [`ScriptedTools::for_customer`] with `true`, the way the storefront
/// endpoint answers HTTP 401 without a customer token.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTools {
    inner: Arc<ScriptedToolsInner>,
    authorized: bool,
}

impl ScriptedTools {
    /// Tools named `names`; those in `customer_scoped` need a customer.
    #[must_use]
    pub fn new(names: &[&str], customer_scoped: &[&str]) -> Self {
        let tools = names
            .iter()
            .map(|name| Tool {
                name: (*name).to_string(),
                description: format!("Scripted {name}"),
                input_schema: json!({ "type": "object", "properties": {} }),
            })
            .collect();
        Self {
            inner: Arc::new(ScriptedToolsInner {
                tools,
                customer_scoped: customer_scoped.iter().map(|s| (*s).to_string()).collect(),
                ..ScriptedToolsInner::default()
            }),
            authorized: false,
        }
    }

    /// A view of the same tools with or without customer credentials.
    #[must_use]
    pub fn for_customer(&self, authorized: bool) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            authorized,
        }
    }

    /// Queue an answer for `name`.
    pub fn answer(&self, name: &str, answer: ToolAnswer) {
        lock(&self.inner.answers)
            .entry(name.to_string())
            .or_default()
            .push_back(answer);
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ToolCall> {
        lock(&self.inner.calls).clone()
    }
}

impl ToolInvoker for ScriptedTools {
    async fn list_tools(&self) -> Result<Vec<Tool>, McpError> {
        Ok(self.inner.tools.clone())
    }

    async fn invoke(
        &self,
        tool_use_id: &ToolUseId,
        name: &str,
        arguments: &Value,
    ) -> ToolInvocationOutcome {
        lock(&self.inner.calls).push(ToolCall {
            name: name.to_string(),
            arguments: arguments.clone(),
            authorized: self.authorized,
        });

        if self.inner.customer_scoped.contains(name) && !self.authorized {
            return ToolInvocationOutcome::failure(
                name,
                tool_use_id.clone(),
                McpError::AuthRequired.error_type(),
                Value::String(AUTH_REQUIRED_MESSAGE.to_string()),
            );
        }

        let answer = lock(&self.inner.answers)
            .get_mut(name)
            .and_then(VecDeque::pop_front);
        match answer {
            Some(ToolAnswer::Content(content)) => {
                ToolInvocationOutcome::success(name, tool_use_id.clone(), content)
            }
            Some(ToolAnswer::Failed(message)) => ToolInvocationOutcome::failure(
                name,
                tool_use_id.clone(),
                "tool_error",
                Value::String(message),
            ),
            None => ToolInvocationOutcome::failure(
                name,
                tool_use_id.clone(),
                "tool_error",
                Value::String(format!("Error calling tool {name}: no scripted answer")),
            ),
        }
    }
}

// ============================================================================
// Widget backend
// ============================================================================

/// Widget backend that runs chat turns in-process against a memory store.
#[derive(Debug, Clone)]
pub struct InProcessBackend {
    pub model: ScriptedModel,
    pub tools: ScriptedTools,
    pub store: MemoryStore,
    router: ToolResultRouter,
}

impl InProcessBackend {
    #[must_use]
    pub fn new(model: ScriptedModel, tools: ScriptedTools) -> Self {
        Self {
            model,
            tools,
            store: MemoryStore::new(),
            router: ToolResultRouter::new(SEARCH_TOOL, MAX_PRODUCTS),
        }
    }

    /// Store a customer token for `conversation_id`, completing authorization.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the token.
    pub async fn authorize(&self, conversation_id: &ConversationId) {
        let token = CustomerToken {
            access_token: SecretString::from("shcat_integration"),
            expires_at: None,
        };
        self.store
            .store_customer_token(conversation_id, &token)
            .await
            .expect("store customer token");
    }
}

fn store_error(e: impl std::fmt::Display) -> WidgetError {
    WidgetError::Stream(e.to_string())
}

impl ChatBackend for InProcessBackend {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, WidgetError> {
        let authorized = match &request.conversation_id {
            Some(id) => self
                .store
                .active_customer_token(id)
                .await
                .map_err(store_error)?
                .is_some(),
            None => false,
        };

        let turn = ChatTurnRequest {
            message: request.message.clone(),
            conversation_id: request.conversation_id.clone(),
            prompt_type: request.prompt_type.clone(),
            shop_name: "Integration Shop".to_string(),
        };
        let events = stream_chat_turn(
            self.model.clone(),
            self.tools.for_customer(authorized),
            self.store.clone(),
            self.router.clone(),
            turn,
        );
        Ok(events.map(|event| Ok(sse_frame(&event))).boxed())
    }

    async fn token_status(&self, conversation_id: &ConversationId) -> Result<TokenStatus, WidgetError> {
        self.store
            .token_status(conversation_id)
            .await
            .map_err(store_error)
    }

    async fn history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<StoredMessage>, WidgetError> {
        self.store
            .get_history(conversation_id)
            .await
            .map_err(store_error)
    }
}

// ============================================================================
// HTTP server
// ============================================================================

/// Server configuration whose model and tool endpoints are unreachable.
///
/// # Panics
///
/// Never in practice; the tool endpoint URL is a constant.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        database_url: None,
        shop_name: "Integration Shop".to_string(),
        claude: ClaudeConfig {
            api_key: SecretString::from("sk-ant-integration"),
            model: "claude-test".to_string(),
        },
        mcp: McpConfig {
            endpoint: Url::parse("http://127.0.0.1:9/api/mcp").expect("url"),
            product_search_tool: SEARCH_TOOL.to_string(),
            max_products: MAX_PRODUCTS,
        },
        allowed_origins: Vec::new(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Serve the chat routes over `store` on an ephemeral local port.
///
/// Returns the base URL. The server runs until the runtime shuts down.
///
/// # Panics
///
/// Panics if the listener cannot be bound or a client cannot be built.
pub async fn spawn_server(store: MemoryStore) -> Url {
    let config = test_config();
    let claude = ClaudeClient::new(config.claude()).expect("claude client");
    let mcp = McpClient::new(config.mcp()).expect("mcp client");
    let state = AppState::new(config, Store::Memory(store), claude, mcp);
    let app = routes::routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Url::parse(&format!("http://{addr}/")).expect("server url")
}
