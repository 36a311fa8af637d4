//! Graph-wide flow propagation.
//!
//! A pass runs in three phases:
//!
//! 1. Every non-logistics node is resolved on its own; none of them depend on
//!    their neighbours.
//! 2. Logistics nodes are resolved in [`FlowGraph::logistic_order`] using the
//!    flows now known at their connected ports. Logistics nodes can feed each
//!    other, so the phase repeats until no flow moves by more than the
//!    configured tolerance, or the iteration bound is hit. Nodes still moving
//!    at that point are reported as not converged and their flows are cleared.
//! 3. Every edge is checked: matching form, belt direction, shared items and
//!    per-item balance.
//!
//! The pass never fails; every fault becomes a [`Diagnostic`].

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::diagnostic::Diagnostic;
use crate::graph::{Endpoint, FlowGraph, GraphEdge, GraphSnapshot};
use crate::id::{EdgeId, ItemId, NodeKey};
use crate::node::NodeKind;
use crate::port::{Form, Io, PortId};
use crate::report::{EdgeReport, FlowReport, NodeFlows, NodeStatus};
use crate::resolver::{Flow, Inbound, Resolution, ResolvedPort, resolve_logistic};
use slotmap::SecondaryMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Working state of one node during a pass.
#[derive(Debug, Clone)]
struct NodeState {
    status: NodeStatus,
    ports: Vec<ResolvedPort>,
}

impl NodeState {
    fn empty(status: NodeStatus) -> Self {
        Self {
            status,
            ports: Vec::new(),
        }
    }

    fn flows_at(&self, port: PortId) -> Option<&[Flow]> {
        self.ports
            .iter()
            .find(|p| p.id == port)
            .map(|p| p.flows.as_slice())
    }
}

/// Compute per-port flows for every node and validate every edge.
pub fn compute_flows(catalog: &Catalog, snapshot: &GraphSnapshot, config: &EngineConfig) -> FlowReport {
    let (graph, mut diagnostics) = FlowGraph::index(snapshot);
    debug!(
        nodes = graph.node_count(),
        edges = graph.edges().len(),
        rejected = graph.rejected_edges().len(),
        "indexed graph snapshot"
    );

    let mut states = resolve_independent(&graph, catalog, &mut diagnostics);
    resolve_logistics(&graph, config, &mut states, &mut diagnostics);
    let edges = validate_edges(&graph, &states, config, &mut diagnostics);

    let mut report = FlowReport {
        nodes: BTreeMap::new(),
        edges,
        diagnostics,
    };
    for &key in graph.keys() {
        let (Some(node), Some(state)) = (graph.node(key), states.remove(key)) else {
            continue;
        };
        report.nodes.insert(
            node.id.clone(),
            NodeFlows {
                status: state.status,
                ports: state.ports,
            },
        );
    }
    for edge in graph.rejected_edges() {
        report.edges.insert(
            edge.clone(),
            EdgeReport {
                flows: Vec::new(),
                valid: false,
            },
        );
    }
    debug!(summary = %report.summary(), "flow pass complete");
    report
}

// ---------------------------------------------------------------------------
// Phase 1: nodes without neighbour dependencies
// ---------------------------------------------------------------------------

fn resolve_independent(
    graph: &FlowGraph,
    catalog: &Catalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> SecondaryMap<NodeKey, NodeState> {
    let mut states = SecondaryMap::new();
    let mut resolved = 0usize;

    for &key in graph.keys() {
        let Some(node) = graph.node(key) else {
            continue;
        };
        let state = match &node.kind {
            None => NodeState::empty(NodeStatus::Invalid),
            // Filled in by the logistics phase.
            Some(NodeKind::Logistic(_)) => NodeState::empty(NodeStatus::Resolved),
            Some(kind) => match kind.resolve(catalog, &Inbound::new()) {
                Ok(resolution) => {
                    resolved += 1;
                    NodeState {
                        status: NodeStatus::Resolved,
                        ports: resolution.ports,
                    }
                }
                Err(reason) => {
                    debug!(node = %node.id, %reason, "node unset");
                    diagnostics.push(Diagnostic::Unresolved {
                        node: node.id.clone(),
                        reason,
                    });
                    NodeState::empty(NodeStatus::Unset)
                }
            },
        };
        states.insert(key, state);
    }
    debug!(resolved, "resolved independent nodes");
    states
}

// ---------------------------------------------------------------------------
// Phase 2: logistics fixpoint
// ---------------------------------------------------------------------------

/// Peer flows at each of `key`'s connected ports. Ports connected more than
/// once see the concatenation of their peers' flows. A far port with several
/// edges splits its flow evenly across them.
fn gather_inbound(graph: &FlowGraph, states: &SecondaryMap<NodeKey, NodeState>, key: NodeKey) -> Inbound {
    let mut inbound = Inbound::new();
    for edge in graph.links(key) {
        let Some((near, far)) = edge.other_end(key) else {
            continue;
        };
        let peer = states
            .get(far.node)
            .and_then(|state| state.flows_at(far.port))
            .unwrap_or_default();
        inbound
            .entry(near)
            .or_default()
            .extend(shared(peer, graph.degree(far)));
    }
    inbound
}

/// The part of a port's flows carried by one of its `degree` edges.
fn shared(flows: &[Flow], degree: usize) -> impl Iterator<Item = Flow> + '_ {
    let ways = degree.max(1) as f64;
    flows
        .iter()
        .map(move |flow| Flow::new(flow.item.clone(), flow.speed / ways))
}

fn same_flows(a: &[ResolvedPort], b: &[ResolvedPort], config: &EngineConfig) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(pa, pb)| {
            pa.id == pb.id
                && pa.flows.len() == pb.flows.len()
                && pa
                    .flows
                    .iter()
                    .zip(&pb.flows)
                    .all(|(fa, fb)| fa.item == fb.item && config.close(fa.speed, fb.speed))
        })
}

fn resolve_logistics(
    graph: &FlowGraph,
    config: &EngineConfig,
    states: &mut SecondaryMap<NodeKey, NodeState>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let order = graph.logistic_order();
    if order.is_empty() {
        return;
    }

    let mut last: SecondaryMap<NodeKey, Resolution> = SecondaryMap::new();
    let mut moving: Vec<NodeKey> = order.clone();
    let mut passes = 0;

    while passes < config.max_iterations && !moving.is_empty() {
        passes += 1;
        moving.clear();
        for &key in &order {
            let Some(NodeKind::Logistic(data)) = graph.node(key).and_then(|n| n.kind.as_ref()) else {
                continue;
            };
            let inbound = gather_inbound(graph, states, key);
            let resolution = resolve_logistic(data, &inbound);

            let settled = last
                .get(key)
                .is_some_and(|previous| same_flows(&previous.ports, &resolution.ports, config));
            if !settled {
                moving.push(key);
            }
            if let Some(state) = states.get_mut(key) {
                state.ports = resolution.ports.clone();
            }
            last.insert(key, resolution);
        }
        debug!(pass = passes, moving = moving.len(), "logistics pass");
    }

    for &key in &order {
        let Some(node) = graph.node(key) else {
            continue;
        };
        if moving.contains(&key) {
            warn!(node = %node.id, passes, "logistics flow did not converge");
            diagnostics.push(Diagnostic::NotConverged {
                node: node.id.clone(),
                iterations: passes,
            });
            if let Some(state) = states.get_mut(key) {
                state.status = NodeStatus::NotConverged;
                for port in &mut state.ports {
                    port.flows.clear();
                }
            }
            continue;
        }
        let Some(resolution) = last.remove(key) else {
            continue;
        };
        for issue in resolution.issues {
            let diagnostic = Diagnostic::from_issue(&node.id, issue);
            warn!(node = %node.id, "{diagnostic}");
            diagnostics.push(diagnostic);
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 3: edge validation
// ---------------------------------------------------------------------------

fn items(flows: &[Flow]) -> BTreeSet<&ItemId> {
    flows.iter().map(|flow| &flow.item).collect()
}

/// Outcome of checking one edge on its own.
struct EdgeCheck {
    flows: Vec<Flow>,
    found: Vec<Diagnostic>,
    /// Both ends carry flows and the edge passed every structural check, so
    /// it can take part in a port balance.
    comparable: bool,
}

impl EdgeCheck {
    fn done(flows: Vec<Flow>, found: Vec<Diagnostic>) -> Self {
        Self {
            flows,
            found,
            comparable: false,
        }
    }
}

/// Check one edge, returning the diagnostics it raises. Balance is checked
/// here only when neither end has other edges; fanned ports are balanced as a
/// whole by [`check_fanned_ports`].
fn check_edge(
    graph: &FlowGraph,
    states: &SecondaryMap<NodeKey, NodeState>,
    edge: &GraphEdge,
    config: &EngineConfig,
) -> EdgeCheck {
    let mut found = Vec::new();
    let mut ends = Vec::with_capacity(2);

    for end in [edge.source, edge.target] {
        let (Some(node), Some(state)) = (graph.node(end.node), states.get(end.node)) else {
            return EdgeCheck::done(Vec::new(), found);
        };
        // Unset and invalid nodes have no ports to check against; the node
        // diagnostic already covers them.
        if matches!(state.status, NodeStatus::Unset | NodeStatus::Invalid) {
            return EdgeCheck::done(Vec::new(), found);
        }
        match state.flows_at(end.port) {
            Some(flows) => ends.push(flows),
            None => found.push(Diagnostic::UnknownPort {
                edge: edge.id.clone(),
                node: node.id.clone(),
                port: end.port.to_string(),
            }),
        }
    }
    let &[source_flows, target_flows] = ends.as_slice() else {
        return EdgeCheck::done(Vec::new(), found);
    };
    let (source_degree, target_degree) = (graph.degree(edge.source), graph.degree(edge.target));
    let throughput: Vec<Flow> = if source_flows.is_empty() {
        shared(target_flows, target_degree)
            .map(|flow| flow.as_seen_by_peer())
            .collect()
    } else {
        shared(source_flows, source_degree).collect()
    };

    let (from, to) = (edge.source.port, edge.target.port);
    if from.form != to.form {
        found.push(Diagnostic::FormMismatch {
            edge: edge.id.clone(),
            from: from.form,
            to: to.form,
        });
        return EdgeCheck::done(throughput, found);
    }
    if from.form == Form::Solid && (from.io != Io::Out || to.io != Io::In) {
        found.push(Diagnostic::DirectionMismatch {
            edge: edge.id.clone(),
        });
        return EdgeCheck::done(throughput, found);
    }
    if source_flows.is_empty() || target_flows.is_empty() {
        return EdgeCheck::done(throughput, found);
    }

    let (source_items, target_items) = (items(source_flows), items(target_flows));
    if source_items.is_disjoint(&target_items) {
        found.push(Diagnostic::ItemMismatch {
            edge: edge.id.clone(),
            from: source_items.into_iter().cloned().collect(),
            to: target_items.into_iter().cloned().collect(),
        });
        return EdgeCheck::done(throughput, found);
    }

    if source_degree <= 1 && target_degree <= 1 {
        let mut net: BTreeMap<&ItemId, f64> = BTreeMap::new();
        for flow in source_flows.iter().chain(target_flows) {
            *net.entry(&flow.item).or_insert(0.0) += flow.speed;
        }
        for (item, net) in net {
            if !config.close(net, 0.0) {
                found.push(Diagnostic::Imbalance {
                    edge: edge.id.clone(),
                    item: item.clone(),
                    net,
                });
            }
        }
    }
    EdgeCheck {
        flows: throughput,
        found,
        comparable: true,
    }
}

/// Balance every port that has more than one edge: its own flow against the
/// sum of what each peer puts on the shared edges. An imbalance is reported
/// on every edge at the port. Ports with an edge that failed its own checks
/// are skipped.
fn check_fanned_ports(
    graph: &FlowGraph,
    states: &SecondaryMap<NodeKey, NodeState>,
    config: &EngineConfig,
    checks: &mut [EdgeCheck],
) {
    let edges = graph.edges();
    let mut slots: HashMap<Endpoint, usize> = HashMap::new();
    let mut fanned: Vec<(Endpoint, Vec<usize>)> = Vec::new();
    for (index, edge) in edges.iter().enumerate() {
        for end in [edge.source, edge.target] {
            if graph.degree(end) <= 1 {
                continue;
            }
            let slot = *slots.entry(end).or_insert_with(|| {
                fanned.push((end, Vec::new()));
                fanned.len() - 1
            });
            let members = &mut fanned[slot].1;
            if !members.contains(&index) {
                members.push(index);
            }
        }
    }

    for (end, members) in &fanned {
        if !members.iter().all(|&index| checks[index].comparable) {
            continue;
        }
        let Some(own) = states.get(end.node).and_then(|state| state.flows_at(end.port)) else {
            continue;
        };
        let mut net: BTreeMap<&ItemId, f64> = BTreeMap::new();
        for flow in own {
            *net.entry(&flow.item).or_insert(0.0) += flow.speed;
        }
        for &index in members {
            let edge = &edges[index];
            let far = if edge.source == *end { edge.target } else { edge.source };
            let Some(peer) = states.get(far.node).and_then(|state| state.flows_at(far.port)) else {
                continue;
            };
            let ways = graph.degree(far).max(1) as f64;
            for flow in peer {
                *net.entry(&flow.item).or_insert(0.0) += flow.speed / ways;
            }
        }

        for (item, net) in net {
            if config.close(net, 0.0) {
                continue;
            }
            for &index in members {
                let check = &mut checks[index];
                let reported = check
                    .found
                    .iter()
                    .any(|d| matches!(d, Diagnostic::Imbalance { item: seen, .. } if seen == item));
                if !reported {
                    check.found.push(Diagnostic::Imbalance {
                        edge: edges[index].id.clone(),
                        item: item.clone(),
                        net,
                    });
                }
            }
        }
    }
}

fn validate_edges(
    graph: &FlowGraph,
    states: &SecondaryMap<NodeKey, NodeState>,
    config: &EngineConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<EdgeId, EdgeReport> {
    let mut checks: Vec<EdgeCheck> = graph
        .edges()
        .iter()
        .map(|edge| check_edge(graph, states, edge, config))
        .collect();
    check_fanned_ports(graph, states, config, &mut checks);

    let mut reports = BTreeMap::new();
    let mut invalid = 0usize;
    for (edge, check) in graph.edges().iter().zip(checks) {
        let valid = !check.found.iter().any(Diagnostic::invalidates_edge);
        if !valid {
            invalid += 1;
        }
        diagnostics.extend(check.found);
        reports.insert(
            edge.id.clone(),
            EdgeReport {
                flows: check.flows,
                valid,
            },
        );
    }
    debug!(edges = reports.len(), invalid, "validated edges");
    reports
}
