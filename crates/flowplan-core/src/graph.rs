//! Graph snapshots and the per-pass node index.
//!
//! A [`GraphSnapshot`] is what the editor hands over: nodes carrying a kind
//! tag and a raw payload, and edges naming ports by their text form. Before a
//! pass it is indexed into a [`FlowGraph`], which decodes every node, drops
//! edges that cannot be attached to anything, and records why.

use crate::diagnostic::Diagnostic;
use crate::id::{EdgeId, NodeId, NodeKey};
use crate::node::{NodeDataError, NodeKind};
use crate::port::{PortId, Rotation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, HashSet, VecDeque};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Canvas position. Carried through untouched; flow computation ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub rotation: Rotation,
}

impl NodeSnapshot {
    pub fn new(id: impl Into<NodeId>, kind: &NodeKind) -> Self {
        Self {
            id: id.into(),
            kind: kind.tag().to_string(),
            data: kind.encode(),
            position: Position::default(),
            rotation: Rotation::default(),
        }
    }

    pub fn decode(&self) -> Result<NodeKind, NodeDataError> {
        NodeKind::decode(&self.kind, &self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub source: NodeId,
    #[serde(alias = "sourceHandle")]
    pub source_port: String,
    pub target: NodeId,
    #[serde(alias = "targetHandle")]
    pub target_port: String,
}

/// The editor's node/edge document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON snapshot. Anything that is not a `{nodes, edges}`
    /// document is rejected; bad content inside the lists is not.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(text).map_err(SnapshotError::Parse)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(SnapshotError::Parse)
    }

    pub fn add_node(&mut self, id: impl Into<NodeId>, kind: &NodeKind) -> &mut Self {
        self.nodes.push(NodeSnapshot::new(id, kind));
        self
    }

    pub fn connect(
        &mut self,
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        source_port: &str,
        target: impl Into<NodeId>,
        target_port: &str,
    ) -> &mut Self {
        self.edges.push(EdgeSnapshot {
            id: id.into(),
            source: source.into(),
            source_port: source_port.to_string(),
            target: target.into(),
            target_port: target_port.to_string(),
        });
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid graph snapshot: {0}")]
    Parse(#[source] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: NodeId,
    /// `None` when the payload could not be decoded.
    pub kind: Option<NodeKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: NodeKey,
    pub port: PortId,
}

#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source: Endpoint,
    pub target: Endpoint,
}

impl GraphEdge {
    /// The far end of this edge as seen from `node`, with the near port.
    /// Self-loops yield the opposite endpoint of the one matched.
    pub fn other_end(&self, node: NodeKey) -> Option<(PortId, Endpoint)> {
        if self.source.node == node {
            Some((self.source.port, self.target))
        } else if self.target.node == node {
            Some((self.target.port, self.source))
        } else {
            None
        }
    }
}

/// A snapshot decoded and keyed for one propagation pass.
#[derive(Debug, Default)]
pub struct FlowGraph {
    nodes: SlotMap<NodeKey, GraphNode>,
    /// Node keys in snapshot order.
    order: Vec<NodeKey>,
    edges: Vec<GraphEdge>,
    /// Edges, by index into `edges`, touching each node.
    links: SecondaryMap<NodeKey, Vec<usize>>,
    /// Unique edges that could not be attached.
    rejected: Vec<EdgeId>,
    /// Number of attached edges at each port.
    degrees: HashMap<Endpoint, usize>,
}

impl FlowGraph {
    /// Decode and index a snapshot. The first copy of a duplicated node or
    /// edge id wins.
    pub fn index(snapshot: &GraphSnapshot) -> (FlowGraph, Vec<Diagnostic>) {
        let mut graph = FlowGraph::default();
        let mut diagnostics = Vec::new();
        let mut by_id: HashMap<&NodeId, NodeKey> = HashMap::new();

        for node in &snapshot.nodes {
            if by_id.contains_key(&node.id) {
                diagnostics.push(Diagnostic::DuplicateNode {
                    node: node.id.clone(),
                });
                continue;
            }
            let kind = match node.decode() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    diagnostics.push(Diagnostic::InvalidNode {
                        node: node.id.clone(),
                        detail: e.to_string(),
                    });
                    None
                }
            };
            let key = graph.nodes.insert(GraphNode {
                id: node.id.clone(),
                kind,
            });
            graph.links.insert(key, Vec::new());
            graph.order.push(key);
            by_id.insert(&node.id, key);
        }

        let mut seen_edges: HashSet<&EdgeId> = HashSet::new();
        for edge in &snapshot.edges {
            if !seen_edges.insert(&edge.id) {
                diagnostics.push(Diagnostic::DuplicateEdge {
                    edge: edge.id.clone(),
                });
                continue;
            }

            let mut attach = |node: &NodeId, port: &str| -> Option<Endpoint> {
                let Some(&key) = by_id.get(node) else {
                    diagnostics.push(Diagnostic::DanglingEdge {
                        edge: edge.id.clone(),
                        node: node.clone(),
                    });
                    return None;
                };
                match port.parse::<PortId>() {
                    Ok(port) => Some(Endpoint { node: key, port }),
                    Err(_) => {
                        diagnostics.push(Diagnostic::UnknownPort {
                            edge: edge.id.clone(),
                            node: node.clone(),
                            port: port.to_string(),
                        });
                        None
                    }
                }
            };
            let source = attach(&edge.source, &edge.source_port);
            let target = attach(&edge.target, &edge.target_port);

            match (source, target) {
                (Some(source), Some(target)) => {
                    let index = graph.edges.len();
                    graph.edges.push(GraphEdge {
                        id: edge.id.clone(),
                        source,
                        target,
                    });
                    for end in [source, target] {
                        *graph.degrees.entry(end).or_insert(0) += 1;
                    }
                    for key in [source.node, target.node] {
                        if let Some(links) = graph.links.get_mut(key)
                            && !links.contains(&index)
                        {
                            links.push(index);
                        }
                    }
                }
                _ => graph.rejected.push(edge.id.clone()),
            }
        }

        (graph, diagnostics)
    }

    pub fn node(&self, key: NodeKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    /// Node keys in snapshot order.
    pub fn keys(&self) -> &[NodeKey] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn rejected_edges(&self) -> &[EdgeId] {
        &self.rejected
    }

    /// Number of edges attached at `end`.
    pub fn degree(&self, end: Endpoint) -> usize {
        self.degrees.get(&end).copied().unwrap_or(0)
    }

    /// Edges touching `key`.
    pub fn links(&self, key: NodeKey) -> impl Iterator<Item = &GraphEdge> {
        self.links
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.edges.get(index))
    }

    fn is_logistic(&self, key: NodeKey) -> bool {
        self.nodes
            .get(key)
            .and_then(|node| node.kind.as_ref())
            .is_some_and(NodeKind::is_logistic)
    }

    /// Evaluation order for logistics nodes.
    ///
    /// Kahn's algorithm over the edges that join two logistics nodes, running
    /// source to target. Nodes left over sit on a cycle and are appended
    /// sorted by id.
    pub fn logistic_order(&self) -> Vec<NodeKey> {
        let logistic: Vec<NodeKey> = self
            .order
            .iter()
            .copied()
            .filter(|&key| self.is_logistic(key))
            .collect();

        let mut in_degree: SecondaryMap<NodeKey, usize> = SecondaryMap::new();
        for &key in &logistic {
            in_degree.insert(key, 0);
        }
        let internal: Vec<&GraphEdge> = self
            .edges
            .iter()
            .filter(|e| in_degree.contains_key(e.source.node) && in_degree.contains_key(e.target.node))
            .collect();
        for edge in &internal {
            if let Some(deg) = in_degree.get_mut(edge.target.node) {
                *deg += 1;
            }
        }

        let mut queue: VecDeque<NodeKey> = logistic
            .iter()
            .copied()
            .filter(|&key| in_degree.get(key) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(logistic.len());
        while let Some(key) = queue.pop_front() {
            order.push(key);
            for edge in internal.iter().filter(|e| e.source.node == key) {
                if let Some(deg) = in_degree.get_mut(edge.target.node) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(edge.target.node);
                    }
                }
            }
        }

        if order.len() < logistic.len() {
            let placed: HashSet<NodeKey> = order.iter().copied().collect();
            let mut cycle: Vec<NodeKey> = logistic
                .into_iter()
                .filter(|key| !placed.contains(key))
                .collect();
            cycle.sort_by(|a, b| self.nodes[*a].id.cmp(&self.nodes[*b].id));
            order.extend(cycle);
        }
        order
    }
}
