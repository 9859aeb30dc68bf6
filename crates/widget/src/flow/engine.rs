//! Flow state transitions.
//!
//! [`transition`] never touches the presenter or the clock. It returns the new
//! state and the effects to run, in order. Effects after a [`FlowEffect::Pause`]
//! are rendered once the reply delay has elapsed.

use super::{FlowGraph, QuickReply, ReplyTarget};

/// Assistant message shown when the visitor leaves the flow for the assistant.
pub const ESCAPE_MESSAGE: &str = "Feel free to type your question below!";

/// Position in the flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    /// The flow is not shown; free text goes to the assistant.
    #[default]
    Inactive,
    /// Starters are shown.
    Root,
    /// A node and its quick replies are shown.
    Node(String),
}

/// Visitor input fed to the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowInput {
    /// Show the starters.
    Start,
    /// Pick the starter or quick reply at this index.
    Select(usize),
    /// The visitor typed a message.
    FreeText,
}

/// Presentation change produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEffect {
    RenderUser(String),
    RenderAssistant(String),
    ShowStarters(Vec<QuickReply>),
    HideStarters,
    ShowReplies(Vec<QuickReply>),
    ClearReplies,
    /// Wait for the reply delay before running the remaining effects.
    Pause,
}

/// Result of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: FlowState,
    pub effects: Vec<FlowEffect>,
}

impl Transition {
    fn stay(state: &FlowState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }

    /// Whether the transition changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Compute the next flow state.
#[must_use]
pub fn transition(state: &FlowState, input: FlowInput, graph: &FlowGraph) -> Transition {
    match (state, input) {
        (FlowState::Inactive, FlowInput::Start) => Transition {
            state: FlowState::Root,
            effects: vec![FlowEffect::ShowStarters(graph.starters.clone())],
        },
        (FlowState::Inactive, _) | (_, FlowInput::Start) => Transition::stay(state),
        (_, FlowInput::FreeText) => Transition {
            state: FlowState::Inactive,
            effects: vec![FlowEffect::HideStarters, FlowEffect::ClearReplies],
        },
        (FlowState::Root, FlowInput::Select(index)) => graph
            .starters
            .get(index)
            .map_or_else(
                || Transition::stay(state),
                |reply| follow(state, reply, FlowEffect::HideStarters, graph),
            ),
        (FlowState::Node(id), FlowInput::Select(index)) => graph
            .node(id)
            .and_then(|node| node.quick_replies.get(index))
            .map_or_else(
                || Transition::stay(state),
                |reply| follow(state, reply, FlowEffect::ClearReplies, graph),
            ),
    }
}

fn follow(state: &FlowState, reply: &QuickReply, leave: FlowEffect, graph: &FlowGraph) -> Transition {
    match &reply.next {
        ReplyTarget::Escape => Transition {
            state: FlowState::Inactive,
            effects: vec![
                leave,
                FlowEffect::RenderUser(reply.label.clone()),
                FlowEffect::RenderAssistant(ESCAPE_MESSAGE.to_string()),
            ],
        },
        ReplyTarget::Restart => Transition {
            state: FlowState::Root,
            effects: vec![leave, FlowEffect::ShowStarters(graph.starters.clone())],
        },
        ReplyTarget::Node(target) => {
            let Some(node) = graph.node(target) else {
                tracing::debug!(node = %target, "Unknown flow node");
                return Transition::stay(state);
            };
            let mut effects = vec![
                leave,
                FlowEffect::RenderUser(reply.label.clone()),
                FlowEffect::Pause,
                FlowEffect::RenderAssistant(node.message.clone()),
            ];
            if !node.quick_replies.is_empty() {
                effects.push(FlowEffect::ShowReplies(node.quick_replies.clone()));
            }
            Transition {
                state: FlowState::Node(target.clone()),
                effects,
            }
        }
    }
}
