//! Runs flow transitions against a presenter.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use shop_chat_core::ChatRole;

use super::engine::{FlowEffect, FlowInput, FlowState, transition};
use super::FlowGraph;
use crate::config::FlowTiming;
use crate::ports::Presenter;

#[derive(Debug, Default)]
struct DriverState {
    state: FlowState,
    /// A delayed render is outstanding; selections are ignored.
    pending: bool,
    /// Bumped whenever the flow is torn down.
    generation: u64,
}

/// Scripted flow bound to a presenter.
pub struct FlowDriver<P> {
    graph: Arc<FlowGraph>,
    presenter: Arc<P>,
    timing: FlowTiming,
    inner: Mutex<DriverState>,
}

impl<P: Presenter> FlowDriver<P> {
    /// Create an inactive flow.
    #[must_use]
    pub fn new(graph: Arc<FlowGraph>, presenter: Arc<P>, timing: FlowTiming) -> Self {
        Self {
            graph,
            presenter,
            timing,
            inner: Mutex::new(DriverState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current position.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.lock().state.clone()
    }

    /// Whether starters or quick replies are on screen.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().state != FlowState::Inactive
    }

    /// Whether a delayed render is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Show the starters.
    pub async fn start(&self) {
        self.handle(FlowInput::Start).await;
    }

    /// Pick the starter or quick reply at `index`.
    ///
    /// Returns `false` when the selection was ignored.
    pub async fn select(&self, index: usize) -> bool {
        self.handle(FlowInput::Select(index)).await
    }

    /// Tear the flow down because the visitor typed a message.
    pub fn end(&self) {
        let effects = {
            let mut inner = self.lock();
            let step = transition(&inner.state, FlowInput::FreeText, &self.graph);
            if step.is_noop() {
                return;
            }
            inner.state = step.state;
            inner.pending = false;
            inner.generation += 1;
            step.effects
        };
        for effect in effects {
            self.apply(effect);
        }
    }

    async fn handle(&self, input: FlowInput) -> bool {
        let (effects, generation) = {
            let mut inner = self.lock();
            if inner.pending && matches!(input, FlowInput::Select(_)) {
                debug!("Flow selection ignored while a reply is pending");
                return false;
            }
            let step = transition(&inner.state, input, &self.graph);
            if step.is_noop() {
                return false;
            }
            if step.state == FlowState::Inactive {
                inner.generation += 1;
            }
            inner.state = step.state;
            (step.effects, inner.generation)
        };

        for effect in effects {
            if effect == FlowEffect::Pause {
                self.lock().pending = true;
                tokio::time::sleep(self.timing.reply_delay).await;

                let mut inner = self.lock();
                if inner.generation != generation {
                    debug!("Flow torn down during reply delay");
                    return true;
                }
                inner.pending = false;
            } else {
                self.apply(effect);
            }
        }
        true
    }

    fn apply(&self, effect: FlowEffect) {
        match effect {
            FlowEffect::RenderUser(text) => self.presenter.render_message(ChatRole::User, &text),
            FlowEffect::RenderAssistant(text) => {
                self.presenter.render_message(ChatRole::Assistant, &text);
            }
            FlowEffect::ShowStarters(starters) => self.presenter.show_starters(&starters),
            FlowEffect::HideStarters => self.presenter.hide_starters(),
            FlowEffect::ShowReplies(replies) => self.presenter.show_quick_replies(&replies),
            FlowEffect::ClearReplies => self.presenter.clear_quick_replies(),
            FlowEffect::Pause => {}
        }
    }
}
