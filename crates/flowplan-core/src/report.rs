//! The result of one propagation pass.

use crate::diagnostic::Diagnostic;
use crate::id::{EdgeId, NodeId};
use crate::port::PortId;
use crate::resolver::{Flow, ResolvedPort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How far resolution got for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Resolved,
    /// The node points at something missing or has nothing selected.
    Unset,
    /// The node's kind or payload could not be decoded.
    Invalid,
    /// A logistics node whose flows never settled; its flows are unknown.
    NotConverged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFlows {
    pub status: NodeStatus,
    pub ports: Vec<ResolvedPort>,
}

impl NodeFlows {
    pub fn port(&self, id: PortId) -> Option<&ResolvedPort> {
        self.ports.iter().find(|port| port.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeReport {
    /// What travels across the edge, as owned by its source port.
    pub flows: Vec<Flow>,
    pub valid: bool,
}

impl EdgeReport {
    /// Net items per minute across the edge.
    pub fn throughput(&self) -> f64 {
        self.flows.iter().map(|flow| flow.speed).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub nodes: BTreeMap<NodeId, NodeFlows>,
    pub edges: BTreeMap<EdgeId, EdgeReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FlowReport {
    pub fn node(&self, id: &str) -> Option<&NodeFlows> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeReport> {
        self.edges.get(id)
    }

    /// Own flows at one port of one node.
    pub fn port_flows(&self, node: &str, port: PortId) -> Option<&[Flow]> {
        self.node(node)
            .and_then(|flows| flows.port(port))
            .map(|port| port.flows.as_slice())
    }

    pub fn diagnostics_for_node<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.node().is_some_and(|node| node.as_str() == id))
    }

    pub fn diagnostics_for_edge<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.edge().is_some_and(|edge| edge.as_str() == id))
    }

    /// Canonical binary encoding, used to compare reports byte for byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReportError> {
        bitcode::serialize(self).map_err(|e| ReportError::Encode(e.to_string()))
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for flows in self.nodes.values() {
            match flows.status {
                NodeStatus::Resolved => summary.resolved += 1,
                NodeStatus::Unset => summary.unset += 1,
                NodeStatus::Invalid => summary.invalid += 1,
                NodeStatus::NotConverged => summary.not_converged += 1,
            }
        }
        summary.invalid_edges = self.edges.values().filter(|edge| !edge.valid).count();
        for diagnostic in &self.diagnostics {
            *summary.diagnostics.entry(diagnostic.category()).or_insert(0) += 1;
        }
        summary
    }
}

/// Counts for a status line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub resolved: usize,
    pub unset: usize,
    pub invalid: usize,
    pub not_converged: usize,
    pub invalid_edges: usize,
    pub diagnostics: BTreeMap<&'static str, usize>,
}

impl ReportSummary {
    pub fn is_clean(&self) -> bool {
        self.unset == 0
            && self.invalid == 0
            && self.not_converged == 0
            && self.invalid_edges == 0
            && self.diagnostics.is_empty()
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resolved, {} unset, {} invalid, {} not converged, {} invalid edges",
            self.resolved, self.unset, self.invalid, self.not_converged, self.invalid_edges
        )?;
        for (category, count) in &self.diagnostics {
            write!(f, "; {category}: {count}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to encode flow report: {0}")]
    Encode(String),
}
