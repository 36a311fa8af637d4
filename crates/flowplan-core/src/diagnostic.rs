//! Non-fatal conditions found while computing flows.
//!
//! Nothing here stops a pass. Each diagnostic is scoped to a node or an edge
//! so the renderer can highlight the offending element.

use crate::id::{EdgeId, ItemId, NodeId};
use crate::port::Form;
use crate::resolver::{ResolveIssue, Unset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Diagnostic {
    // -- snapshot shape --------------------------------------------------
    #[error("node {node} appears more than once; later copies ignored")]
    DuplicateNode { node: NodeId },
    #[error("edge {edge} appears more than once; later copies ignored")]
    DuplicateEdge { edge: EdgeId },
    #[error("edge {edge} refers to missing node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
    #[error("edge {edge} uses port {port:?}, which node {node} does not have")]
    UnknownPort {
        edge: EdgeId,
        node: NodeId,
        port: String,
    },

    // -- node resolution -------------------------------------------------
    #[error("node {node} has invalid data: {detail}")]
    InvalidNode { node: NodeId, detail: String },
    #[error("node {node} is unset: {reason}")]
    Unresolved { node: NodeId, reason: Unset },
    #[error("pipe junction {node} mixes fluids: {items:?}")]
    MixedFluids { node: NodeId, items: Vec<ItemId> },
    #[error("{speed}/min of {item} at node {node} has no destination")]
    NoDestination {
        node: NodeId,
        item: ItemId,
        speed: f64,
    },
    #[error("cannot resolve flow at node {node} after {iterations} passes")]
    NotConverged { node: NodeId, iterations: usize },

    // -- edge validation -------------------------------------------------
    #[error("edge {edge} connects a {from:?} port to a {to:?} port")]
    FormMismatch { edge: EdgeId, from: Form, to: Form },
    #[error("edge {edge} must run from an output port to an input port")]
    DirectionMismatch { edge: EdgeId },
    #[error("edge {edge} carries {from:?} on one end and {to:?} on the other")]
    ItemMismatch {
        edge: EdgeId,
        from: Vec<ItemId>,
        to: Vec<ItemId>,
    },
    #[error("edge {edge} does not balance: {item} is off by {net}/min")]
    Imbalance { edge: EdgeId, item: ItemId, net: f64 },
}

impl Diagnostic {
    pub(crate) fn from_issue(node: &NodeId, issue: ResolveIssue) -> Self {
        match issue {
            ResolveIssue::MixedFluids { items } => Diagnostic::MixedFluids {
                node: node.clone(),
                items,
            },
            ResolveIssue::NoDestination { item, speed } => Diagnostic::NoDestination {
                node: node.clone(),
                item,
                speed,
            },
        }
    }

    /// The node this diagnostic is scoped to, if any.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Diagnostic::DuplicateNode { node }
            | Diagnostic::InvalidNode { node, .. }
            | Diagnostic::Unresolved { node, .. }
            | Diagnostic::MixedFluids { node, .. }
            | Diagnostic::NoDestination { node, .. }
            | Diagnostic::NotConverged { node, .. } => Some(node),
            _ => None,
        }
    }

    /// The edge this diagnostic is scoped to, if any.
    pub fn edge(&self) -> Option<&EdgeId> {
        match self {
            Diagnostic::DuplicateEdge { edge }
            | Diagnostic::DanglingEdge { edge, .. }
            | Diagnostic::UnknownPort { edge, .. }
            | Diagnostic::FormMismatch { edge, .. }
            | Diagnostic::DirectionMismatch { edge }
            | Diagnostic::ItemMismatch { edge, .. }
            | Diagnostic::Imbalance { edge, .. } => Some(edge),
            _ => None,
        }
    }

    /// Short category name, stable across versions.
    pub fn category(&self) -> &'static str {
        match self {
            Diagnostic::DuplicateNode { .. } => "duplicate_node",
            Diagnostic::DuplicateEdge { .. } => "duplicate_edge",
            Diagnostic::DanglingEdge { .. } => "dangling_edge",
            Diagnostic::UnknownPort { .. } => "unknown_port",
            Diagnostic::InvalidNode { .. } => "invalid_node",
            Diagnostic::Unresolved { .. } => "unresolved",
            Diagnostic::MixedFluids { .. } => "mixed_fluids",
            Diagnostic::NoDestination { .. } => "no_destination",
            Diagnostic::NotConverged { .. } => "not_converged",
            Diagnostic::FormMismatch { .. } => "form_mismatch",
            Diagnostic::DirectionMismatch { .. } => "direction_mismatch",
            Diagnostic::ItemMismatch { .. } => "item_mismatch",
            Diagnostic::Imbalance { .. } => "imbalance",
        }
    }

    /// Whether this diagnostic marks an edge as invalid for rendering.
    pub fn invalidates_edge(&self) -> bool {
        self.edge().is_some() && !matches!(self, Diagnostic::DuplicateEdge { .. })
    }
}
