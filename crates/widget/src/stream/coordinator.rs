//! Client-side state machine for one chat request.
//!
//! Text chunks are buffered silently and rendered as whole messages at
//! `message_complete` / `new_message`. Busy indicator changes, product cards
//! and the authorization handoff are raised as the events arrive.

use std::ops::ControlFlow;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use shop_chat_core::{ChatRequest, ChatRole, StreamEvent};

use super::accumulator::StreamAccumulator;
use super::sse::SseDecoder;
use crate::auth::AuthorizationHandoff;
use crate::config::PollPolicy;
use crate::ports::{ChatBackend, Presenter};
use crate::session::Session;

/// Shown when the request fails or the server reports an error.
pub const STREAM_ERROR_MESSAGE: &str =
    "Sorry, I couldn't process your request. Please try again later.";

/// Shown when the server reports rate limiting.
pub const RATE_LIMIT_MESSAGE: &str =
    "Sorry, our servers are currently busy. Please try again later.";

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The stream ran to its end.
    Completed,
    /// The server sent an `error` event.
    ServerError,
    /// The server sent a `rate_limit_exceeded` event.
    RateLimited,
    /// The request or the body transfer failed.
    ConnectionFailed,
}

/// Drives chat requests and turns their events into presenter calls.
pub struct StreamEventCoordinator<B, P> {
    backend: Arc<B>,
    presenter: Arc<P>,
    session: Session,
    prompt_type: String,
    handoff: AuthorizationHandoff<B, P>,
}

impl<B, P> StreamEventCoordinator<B, P>
where
    B: ChatBackend + 'static,
    P: Presenter + 'static,
{
    /// Create a coordinator and its authorization handoff.
    pub fn new(
        backend: Arc<B>,
        presenter: Arc<P>,
        session: Session,
        prompt_type: impl Into<String>,
        poll_policy: PollPolicy,
    ) -> Arc<Self> {
        let prompt_type = prompt_type.into();
        Arc::new_cyclic(|this| Self {
            handoff: AuthorizationHandoff::new(
                this.clone(),
                Arc::clone(&backend),
                Arc::clone(&presenter),
                session.clone(),
                poll_policy,
            ),
            backend,
            presenter,
            session,
            prompt_type,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn handoff(&self) -> &AuthorizationHandoff<B, P> {
        &self.handoff
    }

    /// Render the visitor's message and stream the answer.
    pub async fn send(&self, utterance: &str) -> StreamOutcome {
        self.presenter.render_message(ChatRole::User, utterance);
        self.presenter.show_busy();
        self.stream_response(utterance).await
    }

    /// Stream the answer to `utterance` without rendering it.
    #[instrument(skip_all, fields(conversation_id = ?self.session.conversation_id()))]
    pub async fn stream_response(&self, utterance: &str) -> StreamOutcome {
        let request = ChatRequest {
            message: utterance.to_string(),
            conversation_id: self.session.conversation_id(),
            prompt_type: self.prompt_type.clone(),
        };

        let mut body = match self.backend.stream_chat(&request).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                return self.fail(STREAM_ERROR_MESSAGE, StreamOutcome::ConnectionFailed);
            }
        };

        let mut decoder = SseDecoder::new();
        let mut accumulator = StreamAccumulator::new();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Chat stream broke off");
                    return self.fail(STREAM_ERROR_MESSAGE, StreamOutcome::ConnectionFailed);
                }
            };

            for payload in decoder.push(&bytes) {
                let event = match serde_json::from_str::<StreamEvent>(&payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, payload = %payload, "Skipping malformed stream frame");
                        continue;
                    }
                };
                if let ControlFlow::Break(outcome) = self.apply(event, &mut accumulator, utterance)
                {
                    return outcome;
                }
            }
        }

        if decoder.has_partial() {
            debug!("Chat stream ended inside a frame");
        }
        StreamOutcome::Completed
    }

    fn apply(
        &self,
        event: StreamEvent,
        accumulator: &mut StreamAccumulator,
        utterance: &str,
    ) -> ControlFlow<StreamOutcome> {
        match event {
            StreamEvent::Id { conversation_id } => {
                debug!(conversation_id = %conversation_id, "Conversation assigned");
                self.session.set_conversation_id(conversation_id);
            }
            StreamEvent::Chunk { chunk } => accumulator.push(&chunk),
            StreamEvent::MessageComplete => {
                self.presenter.hide_busy();
                self.flush(accumulator);
            }
            StreamEvent::NewMessage => {
                self.presenter.hide_busy();
                self.flush(accumulator);
                accumulator.reopen();
                self.presenter.show_busy();
            }
            StreamEvent::EndTurn => self.presenter.hide_busy(),
            StreamEvent::ContentBlockComplete => self.presenter.show_busy(),
            StreamEvent::ProductResults { products } => {
                debug!(count = products.len(), "Product results received");
                self.presenter.show_products(&products);
            }
            StreamEvent::AuthRequired => {
                info!("Customer authorization required");
                // The poller runs detached; its handle is not needed here
                let _poller = self.handoff.begin(utterance);
            }
            StreamEvent::Error { error } => {
                warn!(error = %error, "Server reported an error");
                return ControlFlow::Break(
                    self.fail(STREAM_ERROR_MESSAGE, StreamOutcome::ServerError),
                );
            }
            StreamEvent::RateLimitExceeded { error } => {
                warn!(error = %error, "Server rate limited the request");
                return ControlFlow::Break(
                    self.fail(RATE_LIMIT_MESSAGE, StreamOutcome::RateLimited),
                );
            }
            StreamEvent::ToolUse { tool_use_message } => {
                debug!(message = %tool_use_message, "Tool call in progress");
            }
            StreamEvent::Unknown => debug!("Ignoring unknown stream event"),
        }
        ControlFlow::Continue(())
    }

    fn flush(&self, accumulator: &mut StreamAccumulator) {
        if let Some(text) = accumulator.flush() {
            self.presenter.render_message(ChatRole::Assistant, &text);
        }
    }

    fn fail(&self, apology: &str, outcome: StreamOutcome) -> StreamOutcome {
        self.presenter.hide_busy();
        self.presenter.render_message(ChatRole::Assistant, apology);
        outcome
    }
}
