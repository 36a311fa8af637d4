//! Criterion benchmarks for flow computation.
//!
//! - `splitter_chain`: long logistics chains that need several fixpoint passes
//! - `factory_rows`: many independent screw factories side by side
//! - `idempotence`: compute twice and compare encoded reports

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use flowplan_core::config::EngineConfig;
use flowplan_core::graph::GraphSnapshot;
use flowplan_core::node::IoMode;
use flowplan_core::propagate::compute_flows;
use flowplan_core::test_utils::*;
use flowplan_core::validation::validate_idempotence;

/// `rows` copies of the screw factory with distinct ids.
fn factory_rows(rows: usize) -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::new();
    for r in 0..rows {
        let id = |name: &str| format!("{name}_{r}");
        snapshot
            .add_node(id("ore"), &resource_node("Desc_OreIron_C", 30.0))
            .add_node(id("ingots"), &recipe_node("Recipe_IngotIron_C", 1))
            .add_node(id("rods"), &recipe_node("Recipe_IronRod_C", 2))
            .add_node(id("screw_line"), &recipe_node("Recipe_Screw_C", 3))
            .add_node(id("screws"), &item_node("Desc_IronScrew_C", 120.0, IoMode::In))
            .connect(id("e1"), id("ore"), "right:solid:out:0", id("ingots"), "left:solid:in:0")
            .connect(id("e2"), id("ingots"), "right:solid:out:0", id("rods"), "left:solid:in:0")
            .connect(id("e3"), id("rods"), "right:solid:out:0", id("screw_line"), "left:solid:in:0")
            .connect(id("e4"), id("screw_line"), "right:solid:out:0", id("screws"), "left:solid:in:0");
    }
    snapshot
}

fn bench_splitter_chain(c: &mut Criterion) {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let mut group = c.benchmark_group("splitter_chain");
    for len in [8, 64, 256] {
        let snapshot = splitter_chain_snapshot(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &snapshot, |b, snapshot| {
            b.iter(|| compute_flows(&catalog, snapshot, &config));
        });
    }
    group.finish();
}

fn bench_factory_rows(c: &mut Criterion) {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let snapshot = factory_rows(500);
    c.bench_function("factory_rows_500", |b| {
        b.iter(|| compute_flows(&catalog, &snapshot, &config));
    });
}

fn bench_idempotence(c: &mut Criterion) {
    let catalog = sample_catalog();
    let config = EngineConfig::default();
    let snapshot = splitter_chain_snapshot(64);
    c.bench_function("idempotence_chain_64", |b| {
        b.iter(|| validate_idempotence(&catalog, &snapshot, &config).unwrap());
    });
}

criterion_group!(benches, bench_splitter_chain, bench_factory_rows, bench_idempotence);
criterion_main!(benches);
