//! Scripted FAQ flow.
//!
//! A local decision tree shown before the visitor talks to the assistant.
//! [`engine::transition`] is a pure state transition; [`FlowDriver`] runs its
//! effects against the presenter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod content;
pub mod driver;
pub mod engine;

pub use content::faq_graph;
pub use driver::FlowDriver;
pub use engine::{FlowEffect, FlowInput, FlowState, Transition, transition};

/// Wire value of a reply that returns to the starters.
pub const RESTART_TARGET: &str = "__restart";

/// Where a quick reply leads.
///
/// Serialized as the node ID, `"__restart"` or `null` (hand over to the assistant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ReplyTarget {
    /// Show another node.
    Node(String),
    /// Leave the flow and let the visitor type.
    Escape,
    /// Back to the starters.
    Restart,
}

impl From<Option<String>> for ReplyTarget {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::Escape,
            Some(id) if id == RESTART_TARGET => Self::Restart,
            Some(id) => Self::Node(id),
        }
    }
}

impl From<ReplyTarget> for Option<String> {
    fn from(value: ReplyTarget) -> Self {
        match value {
            ReplyTarget::Node(id) => Some(id),
            ReplyTarget::Escape => None,
            ReplyTarget::Restart => Some(RESTART_TARGET.to_string()),
        }
    }
}

/// A selectable pill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub next: ReplyTarget,
}

impl QuickReply {
    /// Reply that opens `node`.
    #[must_use]
    pub fn to(label: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next: ReplyTarget::Node(node.into()),
        }
    }

    /// Reply that hands over to the assistant.
    #[must_use]
    pub fn escape(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next: ReplyTarget::Escape,
        }
    }

    /// Reply that returns to the starters.
    #[must_use]
    pub fn restart(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next: ReplyTarget::Restart,
        }
    }
}

/// One step of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Assistant message (markdown).
    pub message: String,
    #[serde(rename = "quickReplies", default)]
    pub quick_replies: Vec<QuickReply>,
}

/// Errors in a flow definition.
#[derive(Debug, Error)]
pub enum FlowGraphError {
    #[error("{from} links to unknown node {target}")]
    MissingNode { from: String, target: String },

    #[error("Invalid flow definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Starters plus the nodes they lead to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowGraph {
    pub starters: Vec<QuickReply>,
    pub nodes: BTreeMap<String, FlowNode>,
}

impl FlowGraph {
    /// Parse and validate a JSON flow definition.
    ///
    /// # Errors
    ///
    /// Returns `FlowGraphError` if the JSON is malformed or a reply links to
    /// a node that does not exist.
    pub fn from_json(raw: &str) -> Result<Self, FlowGraphError> {
        let graph: Self = serde_json::from_str(raw)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Check that every `Node` target exists.
    ///
    /// # Errors
    ///
    /// Returns the first dangling link found.
    pub fn validate(&self) -> Result<(), FlowGraphError> {
        let starters = self.starters.iter().map(|reply| ("starters", reply));
        let replies = self.nodes.iter().flat_map(|(id, node)| {
            node.quick_replies
                .iter()
                .map(move |reply| (id.as_str(), reply))
        });

        for (from, reply) in starters.chain(replies) {
            let ReplyTarget::Node(target) = &reply.next else {
                continue;
            };
            if !self.nodes.contains_key(target) {
                return Err(FlowGraphError::MissingNode {
                    from: from.to_string(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_target_wire_format() {
        let replies: Vec<QuickReply> = serde_json::from_str(
            r#"[
                {"label": "Ask", "next": null},
                {"label": "Back", "next": "__restart"},
                {"label": "Chart", "next": "ring_size_chart"}
            ]"#,
        )
        .expect("deserialize");
        assert_eq!(replies[0].next, ReplyTarget::Escape);
        assert_eq!(replies[1].next, ReplyTarget::Restart);
        assert_eq!(replies[2].next, ReplyTarget::Node("ring_size_chart".to_string()));

        let value = serde_json::to_value(QuickReply::escape("Ask")).expect("serialize");
        assert!(value["next"].is_null());
    }

    #[test]
    fn test_from_json_rejects_dangling_links() {
        let raw = r#"{
            "starters": [{"label": "Shipping", "next": "shipping"}],
            "nodes": {
                "shipping": {"message": "Ships fast", "quickReplies": [{"label": "More", "next": "nowhere"}]}
            }
        }"#;
        match FlowGraph::from_json(raw) {
            Err(FlowGraphError::MissingNode { from, target }) => {
                assert_eq!(from, "shipping");
                assert_eq!(target, "nowhere");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_accepts_nodes_without_replies() {
        let raw = r#"{
            "starters": [{"label": "Hours", "next": "hours"}],
            "nodes": {"hours": {"message": "9 to 5"}}
        }"#;
        let graph = FlowGraph::from_json(raw).expect("valid graph");
        assert!(graph.node("hours").is_some_and(|n| n.quick_replies.is_empty()));
    }
}
