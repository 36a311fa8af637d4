//! Splitters, mergers, and smart splitters wired into larger networks.

use flowplan_core::config::EngineConfig;
use flowplan_core::diagnostic::Diagnostic;
use flowplan_core::graph::GraphSnapshot;
use flowplan_core::node::{IoMode, LogisticData, NodeKind, OutputRule, RuleFilter};
use flowplan_core::port::{PortId, Side};
use flowplan_core::propagate::compute_flows;
use flowplan_core::report::{FlowReport, NodeStatus};
use flowplan_core::test_utils::*;

const TOLERANCE: f64 = 1e-9;

fn run(snapshot: &GraphSnapshot) -> FlowReport {
    compute_flows(&sample_catalog(), snapshot, &EngineConfig::default())
}

fn speed_at(report: &FlowReport, node: &str, port: &str) -> f64 {
    let port: PortId = port.parse().unwrap();
    report
        .port_flows(node, port)
        .unwrap()
        .iter()
        .map(|f| f.speed)
        .sum()
}

fn categories(report: &FlowReport) -> Vec<&'static str> {
    report.diagnostics.iter().map(Diagnostic::category).collect()
}

// ===========================================================================
// Manifolds
// ===========================================================================

#[test]
fn splitter_manifold_feeds_every_smelter() {
    // Ore at 120/min through four splitters, each tapping one smelter on top.
    let report = run(&splitter_chain_snapshot(4));

    assert!(report.nodes.values().all(|n| n.status == NodeStatus::Resolved));
    assert!(!categories(&report).contains(&"not_converged"));
    for i in 0..4 {
        let tap = report.edge(&format!("tap{i}")).unwrap();
        assert!(tap.valid);
        assert!((tap.throughput() - 30.0).abs() < TOLERANCE, "tap{i}");
    }
    // Every splitter-to-splitter feed balances.
    for i in 0..4 {
        assert!(report.edge(&format!("feed{i}")).unwrap().valid, "feed{i}");
    }
}

#[test]
fn merger_combines_two_smelter_lines() {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("ore_a", &resource_node("Desc_OreIron_C", 30.0))
        .add_node("ore_b", &resource_node("Desc_OreIron_C", 30.0))
        .add_node("smelt_a", &recipe_node("Recipe_IngotIron_C", 1))
        .add_node("smelt_b", &recipe_node("Recipe_IngotIron_C", 1))
        .add_node("merge", &merger())
        .add_node("ingots", &item_node("Desc_IronIngot_C", 60.0, IoMode::In))
        .connect("a1", "ore_a", "right:solid:out:0", "smelt_a", "left:solid:in:0")
        .connect("b1", "ore_b", "right:solid:out:0", "smelt_b", "left:solid:in:0")
        .connect("a2", "smelt_a", "right:solid:out:0", "merge", "left:solid:in:0")
        .connect("b2", "smelt_b", "right:solid:out:0", "merge", "bottom:solid:in:0")
        .connect("out", "merge", "right:solid:out:0", "ingots", "left:solid:in:0");

    let report = run(&snapshot);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!((report.edge("out").unwrap().throughput() - 60.0).abs() < TOLERANCE);
    assert!(speed_at(&report, "merge", "top:solid:in:0").abs() < TOLERANCE);
}

#[test]
fn logistics_conserve_flow_when_nothing_is_dropped() {
    let report = run(&splitter_chain_snapshot(3));
    let mut checked = 0;
    for i in 0..3 {
        let id = format!("split{i}");
        if report.diagnostics_for_node(&id).next().is_some() {
            continue;
        }
        let node = report.node(&id).unwrap();
        let net: f64 = node.ports.iter().flat_map(|p| &p.flows).map(|f| f.speed).sum();
        assert!(net.abs() < TOLERANCE, "{id} nets {net}");
        checked += 1;
    }
    assert!(checked > 0);
}

// ===========================================================================
// Smart splitters
// ===========================================================================

#[test]
fn smart_splitter_sends_remainder_to_overflow_only() {
    let smart = NodeKind::Logistic(LogisticData::SmartSplitter {
        rules: vec![
            OutputRule {
                side: Side::Right,
                filter: RuleFilter::Overflow,
            },
            OutputRule {
                side: Side::Top,
                filter: RuleFilter::Item("Desc_IronRod_C".into()),
            },
            OutputRule {
                side: Side::Bottom,
                filter: RuleFilter::None,
            },
        ],
    });
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("ingots", &item_node("Desc_IronIngot_C", 45.0, IoMode::Out))
        .add_node("smart", &smart)
        .connect("e1", "ingots", "right:solid:out:0", "smart", "left:solid:in:0");

    let report = run(&snapshot);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!((speed_at(&report, "smart", "right:solid:out:0") - 45.0).abs() < TOLERANCE);
    assert!(report
        .port_flows("smart", "top:solid:out:0".parse().unwrap())
        .unwrap()
        .is_empty());
}

#[test]
fn splitter_with_no_open_output_reports_no_destination() {
    let programmable = NodeKind::Logistic(LogisticData::ProgrammableSplitter {
        rules: vec![OutputRule {
            side: Side::Top,
            filter: RuleFilter::None,
        }],
    });
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("ore", &resource_node("Desc_OreIron_C", 30.0))
        .add_node("prog", &programmable)
        .connect("e1", "ore", "right:solid:out:0", "prog", "left:solid:in:0");

    let report = run(&snapshot);
    assert_eq!(categories(&report), vec!["no_destination"]);
    assert_eq!(report.diagnostics[0].node().unwrap().as_str(), "prog");
    // The inbound edge itself still balances.
    assert!(report.edge("e1").unwrap().valid);
}

// ===========================================================================
// Feedback loops
// ===========================================================================

fn recirculating_loop() -> GraphSnapshot {
    // Ore merges into a splitter whose top output loops back to the merger.
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("ore", &resource_node("Desc_OreIron_C", 30.0))
        .add_node("merge", &merger())
        .add_node("split", &splitter())
        .connect("in", "ore", "right:solid:out:0", "merge", "left:solid:in:0")
        .connect("fwd", "merge", "right:solid:out:0", "split", "left:solid:in:0")
        .connect("back", "split", "top:solid:out:0", "merge", "top:solid:in:0");
    snapshot
}

#[test]
fn recirculating_loop_settles_with_surplus() {
    let report = run(&recirculating_loop());

    assert_eq!(report.node("merge").unwrap().status, NodeStatus::Resolved);
    assert_eq!(report.node("split").unwrap().status, NodeStatus::Resolved);
    // The splitter's share sent back into the merger has nowhere to go.
    match report.diagnostics.as_slice() {
        [Diagnostic::NoDestination { node, speed, .. }] => {
            assert_eq!(node.as_str(), "merge");
            assert!((speed - 10.0).abs() < TOLERANCE);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }
    assert!(report.edges.values().all(|e| e.valid));
}

#[test]
fn iteration_bound_downgrades_to_not_converged() {
    let config = EngineConfig {
        max_iterations: 1,
        ..EngineConfig::default()
    };
    let report = compute_flows(&sample_catalog(), &recirculating_loop(), &config);

    assert_eq!(report.node("merge").unwrap().status, NodeStatus::NotConverged);
    assert_eq!(report.node("split").unwrap().status, NodeStatus::NotConverged);
    assert_eq!(report.node("ore").unwrap().status, NodeStatus::Resolved);
    assert_eq!(report.summary().not_converged, 2);
    assert_eq!(categories(&report), vec!["not_converged", "not_converged"]);

    // Unknown flows are reported empty, never guessed.
    let merge = report.node("merge").unwrap();
    assert!(merge.ports.iter().all(|p| p.flows.is_empty()));
    assert_eq!(merge.ports.len(), 4);
}

#[test]
fn balanced_loop_with_sink_settles_cleanly() {
    let mut snapshot = recirculating_loop();
    snapshot
        .add_node("sink", &item_node("Desc_OreIron_C", 30.0, IoMode::In))
        .connect("drain", "split", "right:solid:out:0", "sink", "left:solid:in:0");

    let report = run(&snapshot);
    assert!(!categories(&report).contains(&"not_converged"));
    assert!(!categories(&report).contains(&"imbalance"));
    assert!((report.edge("drain").unwrap().throughput() - 30.0).abs() < 1e-6);
}
