//! Test doubles for the widget ports.
//!
//! Available in this crate's tests and, with the `test-support` feature, to
//! other crates.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::StreamExt;

use shop_chat_core::{
    ChatRequest, ChatRole, ConversationId, DisplayProduct, StoredMessage, StreamEvent, TokenStatus,
};

use crate::error::WidgetError;
use crate::flow::QuickReply;
use crate::ports::{ByteStream, ChatBackend, Presenter};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Something the presenter was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Message { role: ChatRole, text: String },
    BusyShown,
    BusyHidden,
    Products(Vec<DisplayProduct>),
    AuthorizationOpened,
    StartersShown(Vec<String>),
    StartersHidden,
    RepliesShown(Vec<String>),
    RepliesCleared,
}

/// Presenter that records every call.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<Rendered>>,
}

impl RecordingPresenter {
    fn record(&self, event: Rendered) {
        lock(&self.events).push(event);
    }

    /// Every call in order.
    #[must_use]
    pub fn events(&self) -> Vec<Rendered> {
        lock(&self.events).clone()
    }

    /// Rendered chat bubbles in order.
    #[must_use]
    pub fn messages(&self) -> Vec<(ChatRole, String)> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                Rendered::Message { role, text } => Some((*role, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn assistant_messages(&self) -> Vec<String> {
        self.messages_from(ChatRole::Assistant)
    }

    #[must_use]
    pub fn user_messages(&self) -> Vec<String> {
        self.messages_from(ChatRole::User)
    }

    fn messages_from(&self, wanted: ChatRole) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(role, _)| *role == wanted)
            .map(|(_, text)| text)
            .collect()
    }

    /// Product batches in order.
    #[must_use]
    pub fn products(&self) -> Vec<Vec<DisplayProduct>> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                Rendered::Products(products) => Some(products.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether the busy indicator is currently shown.
    #[must_use]
    pub fn busy(&self) -> bool {
        lock(&self.events)
            .iter()
            .rev()
            .find_map(|event| match event {
                Rendered::BusyShown => Some(true),
                Rendered::BusyHidden => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Number of recorded calls equal to `event`.
    #[must_use]
    pub fn count(&self, event: &Rendered) -> usize {
        lock(&self.events).iter().filter(|e| *e == event).count()
    }
}

fn labels(replies: &[QuickReply]) -> Vec<String> {
    replies.iter().map(|r| r.label.clone()).collect()
}

impl Presenter for RecordingPresenter {
    fn render_message(&self, role: ChatRole, text: &str) {
        self.record(Rendered::Message {
            role,
            text: text.to_string(),
        });
    }

    fn show_busy(&self) {
        self.record(Rendered::BusyShown);
    }

    fn hide_busy(&self) {
        self.record(Rendered::BusyHidden);
    }

    fn show_products(&self, products: &[DisplayProduct]) {
        self.record(Rendered::Products(products.to_vec()));
    }

    fn open_authorization(&self) {
        self.record(Rendered::AuthorizationOpened);
    }

    fn show_starters(&self, starters: &[QuickReply]) {
        self.record(Rendered::StartersShown(labels(starters)));
    }

    fn hide_starters(&self) {
        self.record(Rendered::StartersHidden);
    }

    fn show_quick_replies(&self, replies: &[QuickReply]) {
        self.record(Rendered::RepliesShown(labels(replies)));
    }

    fn clear_quick_replies(&self) {
        self.record(Rendered::RepliesCleared);
    }
}

/// Encode an event the way the server frames it.
#[must_use]
pub fn sse_frame(event: &StreamEvent) -> Vec<u8> {
    let json = serde_json::to_string(event).unwrap_or_default();
    format!("data: {json}\n\n").into_bytes()
}

/// Canned response to one chat request.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Body chunks delivered in order.
    Stream(Vec<Vec<u8>>),
    /// Body chunks followed by a connection error.
    Broken(Vec<Vec<u8>>),
    /// Non-success HTTP status.
    Rejected(u16),
}

impl ScriptedResponse {
    /// One chunk per event.
    #[must_use]
    pub fn events(events: &[StreamEvent]) -> Self {
        Self::Stream(events.iter().map(sse_frame).collect())
    }
}

/// Backend that replays scripted responses.
///
/// Chat requests without a script are rejected with 503. Token status polls
/// without a script answer `pending`; a `None` entry fails the poll.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    statuses: Mutex<VecDeque<Option<TokenStatus>>>,
    history: Mutex<Option<Vec<StoredMessage>>>,
    requests: Mutex<Vec<ChatRequest>>,
    status_polls: AtomicUsize,
}

impl ScriptedBackend {
    /// Backend with an empty history and no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        let backend = Self::default();
        backend.set_history(Some(Vec::new()));
        backend
    }

    pub fn push_response(&self, response: ScriptedResponse) {
        lock(&self.responses).push_back(response);
    }

    pub fn push_events(&self, events: &[StreamEvent]) {
        self.push_response(ScriptedResponse::events(events));
    }

    pub fn push_status(&self, status: Option<TokenStatus>) {
        lock(&self.statuses).push_back(status);
    }

    /// History to serve; `None` fails the request.
    pub fn set_history(&self, history: Option<Vec<StoredMessage>>) {
        *lock(&self.history) = history;
    }

    /// Chat requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    /// Token status polls received so far.
    #[must_use]
    pub fn status_polls(&self) -> usize {
        self.status_polls.load(Ordering::SeqCst)
    }
}

impl ChatBackend for ScriptedBackend {
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, WidgetError> {
        lock(&self.requests).push(request.clone());
        let response = lock(&self.responses).pop_front();
        match response {
            Some(ScriptedResponse::Stream(chunks)) => {
                Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
            }
            Some(ScriptedResponse::Broken(chunks)) => {
                let failure = futures::stream::once(async {
                    Err(WidgetError::Stream("connection reset".to_string()))
                });
                Ok(futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(failure)
                    .boxed())
            }
            Some(ScriptedResponse::Rejected(status)) => Err(WidgetError::Status { status }),
            None => Err(WidgetError::Status { status: 503 }),
        }
    }

    async fn token_status(&self, _conversation_id: &ConversationId) -> Result<TokenStatus, WidgetError> {
        self.status_polls.fetch_add(1, Ordering::SeqCst);
        let status = lock(&self.statuses).pop_front();
        match status {
            Some(Some(status)) => Ok(status),
            Some(None) => Err(WidgetError::Status { status: 500 }),
            None => Ok(TokenStatus::Pending),
        }
    }

    async fn history(&self, _conversation_id: &ConversationId) -> Result<Vec<StoredMessage>, WidgetError> {
        lock(&self.history)
            .clone()
            .ok_or(WidgetError::Status { status: 500 })
    }
}
