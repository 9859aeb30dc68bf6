//! The widget as a whole: flow, coordinator and history restore.

use std::sync::Arc;

use tracing::debug;

use shop_chat_core::ChatRole;

use crate::config::{FlowTiming, PollPolicy, WidgetConfig};
use crate::flow::{FlowDriver, FlowGraph, faq_graph};
use crate::history::{RestoreOutcome, restore_history};
use crate::ports::{ChatBackend, Presenter};
use crate::session::Session;
use crate::stream::{StreamEventCoordinator, StreamOutcome};

/// Optional parts of a widget.
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub session: Session,
    pub flow: FlowGraph,
    pub poll_policy: PollPolicy,
    pub flow_timing: FlowTiming,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            session: Session::new(),
            flow: faq_graph(),
            poll_policy: PollPolicy::default(),
            flow_timing: FlowTiming::default(),
        }
    }
}

/// Storefront chat widget engine.
pub struct ChatWidget<B, P> {
    config: WidgetConfig,
    backend: Arc<B>,
    presenter: Arc<P>,
    session: Session,
    coordinator: Arc<StreamEventCoordinator<B, P>>,
    flow: FlowDriver<P>,
}

impl<B, P> ChatWidget<B, P>
where
    B: ChatBackend + 'static,
    P: Presenter + 'static,
{
    /// Widget with a fresh session and the built-in FAQ flow.
    pub fn new(config: WidgetConfig, backend: Arc<B>, presenter: Arc<P>) -> Self {
        Self::with_options(config, backend, presenter, WidgetOptions::default())
    }

    pub fn with_options(
        config: WidgetConfig,
        backend: Arc<B>,
        presenter: Arc<P>,
        options: WidgetOptions,
    ) -> Self {
        let coordinator = StreamEventCoordinator::new(
            Arc::clone(&backend),
            Arc::clone(&presenter),
            options.session.clone(),
            config.prompt_type.clone(),
            options.poll_policy,
        );
        let flow = FlowDriver::new(
            Arc::new(options.flow),
            Arc::clone(&presenter),
            options.flow_timing,
        );
        Self {
            config,
            backend,
            presenter,
            session: options.session,
            coordinator,
            flow,
        }
    }

    /// Show the opening state.
    ///
    /// A known conversation is restored; otherwise the welcome message and the
    /// flow starters are shown.
    pub async fn open(&self) -> RestoreOutcome {
        let outcome = restore_history(
            self.backend.as_ref(),
            self.presenter.as_ref(),
            &self.session,
            &self.config.welcome_message,
        )
        .await;

        if outcome == RestoreOutcome::NoConversation {
            self.presenter
                .render_message(ChatRole::Assistant, &self.config.welcome_message);
            self.flow.start().await;
        }
        outcome
    }

    /// Send typed text to the assistant, ending any active flow.
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn send_text(&self, text: &str) -> Option<StreamOutcome> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank input");
            return None;
        }
        self.flow.end();
        Some(self.coordinator.send(text).await)
    }

    /// Pick the starter or quick reply at `index`.
    pub async fn select(&self, index: usize) -> bool {
        self.flow.select(index).await
    }

    /// Forget the conversation and tear the flow down.
    pub fn reset(&self) {
        self.flow.end();
        self.session.reset();
    }

    #[must_use]
    pub const fn config(&self) -> &WidgetConfig {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn flow(&self) -> &FlowDriver<P> {
        &self.flow
    }

    #[must_use]
    pub fn coordinator(&self) -> &StreamEventCoordinator<B, P> {
        &self.coordinator
    }
}
