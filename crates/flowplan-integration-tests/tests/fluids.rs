//! Pipes: junctions, undirected fluid connections, and form checks.

use flowplan_core::config::EngineConfig;
use flowplan_core::diagnostic::Diagnostic;
use flowplan_core::graph::GraphSnapshot;
use flowplan_core::node::{IoMode, JunctionSides, LogisticData, NodeKind};
use flowplan_core::port::{Form, Io};
use flowplan_core::propagate::compute_flows;
use flowplan_core::report::{FlowReport, NodeStatus};
use flowplan_core::test_utils::*;

const TOLERANCE: f64 = 1e-9;

fn run(snapshot: &GraphSnapshot) -> FlowReport {
    compute_flows(&sample_catalog(), snapshot, &EngineConfig::default())
}

fn categories(report: &FlowReport) -> Vec<&'static str> {
    report.diagnostics.iter().map(Diagnostic::category).collect()
}

fn junction(inputs: &[&str]) -> NodeKind {
    let mut sides = JunctionSides::default();
    for side in inputs {
        match *side {
            "left" => sides.left = Some(Io::In),
            "top" => sides.top = Some(Io::In),
            "right" => sides.right = Some(Io::In),
            "bottom" => sides.bottom = Some(Io::In),
            other => panic!("no side {other}"),
        }
    }
    NodeKind::Logistic(LogisticData::PipeJunction { sides })
}

/// 120/min of crude oil split by a junction into two fuel refineries that
/// each draw 60/min.
fn refinery_pair() -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("well", &resource_node("Desc_LiquidOil_C", 120.0))
        .add_node("junction", &junction(&["left"]))
        .add_node("refinery_a", &recipe_node("Recipe_Fuel_C", 1))
        .add_node("refinery_b", &recipe_node("Recipe_Fuel_C", 1))
        .connect("p0", "well", "right:fluid:out:0", "junction", "left:fluid:in:0")
        .connect("pa", "junction", "top:fluid:out:0", "refinery_a", "left:fluid:in:0")
        .connect("pb", "junction", "right:fluid:out:0", "refinery_b", "left:fluid:in:0");
    snapshot
}

#[test]
fn junction_feeds_two_refineries() {
    let report = run(&refinery_pair());

    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!((report.edge("p0").unwrap().throughput() - 120.0).abs() < TOLERANCE);
    assert!((report.edge("pa").unwrap().throughput() - 60.0).abs() < TOLERANCE);
    assert!((report.edge("pb").unwrap().throughput() - 60.0).abs() < TOLERANCE);
    // Nothing is left over for the unused side.
    assert!(report
        .port_flows("junction", "bottom:fluid:out:0".parse().unwrap())
        .unwrap()
        .is_empty());
}

#[test]
fn fluid_edges_are_undirected() {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("well", &resource_node("Desc_LiquidOil_C", 120.0))
        .add_node("junction", &junction(&["left"]))
        .add_node("refinery_a", &recipe_node("Recipe_Fuel_C", 1))
        .add_node("refinery_b", &recipe_node("Recipe_Fuel_C", 1))
        .connect("p0", "well", "right:fluid:out:0", "junction", "left:fluid:in:0")
        // Drawn from the refinery's inlet back to the junction.
        .connect("pa", "refinery_a", "left:fluid:in:0", "junction", "top:fluid:out:0")
        .connect("pb", "junction", "right:fluid:out:0", "refinery_b", "left:fluid:in:0");

    let report = run(&snapshot);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    let reversed = report.edge("pa").unwrap();
    assert!(reversed.valid);
    // Edge flow is the source port's own view: the refinery consumes.
    assert!((reversed.throughput() + 60.0).abs() < TOLERANCE);
}

#[test]
fn solid_edges_must_run_out_to_in() {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("ore", &resource_node("Desc_OreIron_C", 30.0))
        .add_node("smelter", &recipe_node("Recipe_IngotIron_C", 1))
        .connect("e1", "smelter", "left:solid:in:0", "ore", "right:solid:out:0");

    let report = run(&snapshot);
    assert_eq!(categories(&report), vec!["direction_mismatch"]);
    assert!(!report.edge("e1").unwrap().valid);
}

#[test]
fn junction_rejects_mixed_fluids() {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("water", &resource_node("Desc_Water_C", 60.0))
        .add_node("oil", &resource_node("Desc_LiquidOil_C", 60.0))
        .add_node("junction", &junction(&["left", "bottom"]))
        .connect("w", "water", "right:fluid:out:0", "junction", "left:fluid:in:0")
        .connect("o", "oil", "right:fluid:out:0", "junction", "bottom:fluid:in:0");

    let report = run(&snapshot);
    match report.diagnostics.as_slice() {
        [Diagnostic::MixedFluids { node, items }] => {
            assert_eq!(node.as_str(), "junction");
            let names: Vec<&str> = items.iter().map(|i| i.as_str()).collect();
            assert_eq!(names, vec!["Desc_LiquidOil_C", "Desc_Water_C"]);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }
    // Outputs stay empty rather than carrying a blend.
    let junction = report.node("junction").unwrap();
    assert_eq!(junction.status, NodeStatus::Resolved);
    assert!(junction
        .ports
        .iter()
        .filter(|p| p.id.io == Io::Out)
        .all(|p| p.flows.is_empty()));
}

#[test]
fn water_into_a_belt_input_is_a_form_mismatch() {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("water", &resource_node("Desc_Water_C", 30.0))
        .add_node("smelter", &recipe_node("Recipe_IngotIron_C", 1))
        .connect("e1", "water", "right:fluid:out:0", "smelter", "left:solid:in:0");

    let report = run(&snapshot);
    match report.diagnostics.as_slice() {
        [Diagnostic::FormMismatch { edge, from, to }] => {
            assert_eq!(edge.as_str(), "e1");
            assert_eq!(*from, Form::Fluid);
            assert_eq!(*to, Form::Solid);
        }
        other => panic!("unexpected diagnostics: {other:?}"),
    }
    assert!(!report.edge("e1").unwrap().valid);
}

#[test]
fn gas_travels_through_fluid_ports() {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("vent", &resource_node("Desc_NitrogenGas_C", 45.0))
        .add_node("tank", &item_node("Desc_NitrogenGas_C", 45.0, IoMode::In))
        .connect("g", "vent", "right:fluid:out:0", "tank", "left:fluid:in:0");

    let report = run(&snapshot);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!((report.edge("g").unwrap().throughput() - 45.0).abs() < TOLERANCE);
}
