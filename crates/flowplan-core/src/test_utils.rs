//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::*;
use crate::clock::ClockSpeed;
use crate::graph::GraphSnapshot;
use crate::id::*;
use crate::node::*;

// ===========================================================================
// Sample catalog
// ===========================================================================

fn item(id: &str, name: &str, form: MaterialForm) -> Item {
    Item {
        id: ItemId::from(id),
        name: name.to_string(),
        form: Some(form),
    }
}

fn entry(item: &str, amount: f64) -> RecipeEntry {
    RecipeEntry {
        item: ItemId::from(item),
        amount,
    }
}

pub fn recipe(
    id: &str,
    ingredients: &[(&str, f64)],
    products: &[(&str, f64)],
    machine: &str,
    duration: f64,
) -> Recipe {
    Recipe {
        id: RecipeId::from(id),
        name: id.to_string(),
        ingredients: ingredients.iter().map(|&(i, a)| entry(i, a)).collect(),
        products: products.iter().map(|&(i, a)| entry(i, a)).collect(),
        machine: MachineId::from(machine),
        duration,
    }
}

fn machine(id: &str, name: &str, power: f64) -> ProductionMachine {
    ProductionMachine {
        id: MachineId::from(id),
        name: name.to_string(),
        power,
    }
}

/// Builder preloaded with a small slice of Satisfactory: the iron chain up to
/// reinforced plates, water and crude oil, and the fuel refinery recipe.
pub fn sample_builder() -> CatalogBuilder {
    let mut b = CatalogBuilder::new();
    for (id, name, form) in [
        ("Desc_OreIron_C", "Iron Ore", MaterialForm::Solid),
        ("Desc_IronIngot_C", "Iron Ingot", MaterialForm::Solid),
        ("Desc_IronRod_C", "Iron Rod", MaterialForm::Solid),
        ("Desc_IronScrew_C", "Screw", MaterialForm::Solid),
        ("Desc_IronPlate_C", "Iron Plate", MaterialForm::Solid),
        ("Desc_IronPlateReinforced_C", "Reinforced Iron Plate", MaterialForm::Solid),
        ("Desc_Water_C", "Water", MaterialForm::Liquid),
        ("Desc_LiquidOil_C", "Crude Oil", MaterialForm::Liquid),
        ("Desc_LiquidFuel_C", "Fuel", MaterialForm::Liquid),
        ("Desc_PolymerResin_C", "Polymer Resin", MaterialForm::Solid),
        ("Desc_NitrogenGas_C", "Nitrogen Gas", MaterialForm::Gas),
    ] {
        b.register_item(item(id, name, form)).unwrap();
    }

    for m in [
        machine("Build_SmelterMk1_C", "Smelter", 4.0),
        machine("Build_ConstructorMk1_C", "Constructor", 4.0),
        machine("Build_AssemblerMk1_C", "Assembler", 15.0),
        machine("Build_OilRefinery_C", "Refinery", 30.0),
    ] {
        b.register_machine(m).unwrap();
    }

    for r in [
        recipe(
            "Recipe_IngotIron_C",
            &[("Desc_OreIron_C", 1.0)],
            &[("Desc_IronIngot_C", 1.0)],
            "Build_SmelterMk1_C",
            2.0,
        ),
        recipe(
            "Recipe_IronRod_C",
            &[("Desc_IronIngot_C", 1.0)],
            &[("Desc_IronRod_C", 1.0)],
            "Build_ConstructorMk1_C",
            4.0,
        ),
        recipe(
            "Recipe_Screw_C",
            &[("Desc_IronRod_C", 1.0)],
            &[("Desc_IronScrew_C", 4.0)],
            "Build_ConstructorMk1_C",
            6.0,
        ),
        recipe(
            "Recipe_IronPlate_C",
            &[("Desc_IronIngot_C", 3.0)],
            &[("Desc_IronPlate_C", 2.0)],
            "Build_ConstructorMk1_C",
            6.0,
        ),
        recipe(
            "Recipe_ReinforcedIronPlate_C",
            &[("Desc_IronPlate_C", 6.0), ("Desc_IronScrew_C", 12.0)],
            &[("Desc_IronPlateReinforced_C", 1.0)],
            "Build_AssemblerMk1_C",
            12.0,
        ),
        recipe(
            "Recipe_Fuel_C",
            &[("Desc_LiquidOil_C", 6.0)],
            &[("Desc_LiquidFuel_C", 4.0), ("Desc_PolymerResin_C", 3.0)],
            "Build_OilRefinery_C",
            6.0,
        ),
        recipe(
            "Recipe_Test_OnePerSecond_C",
            &[("Desc_OreIron_C", 1.0)],
            &[("Desc_IronIngot_C", 1.0)],
            "Build_SmelterMk1_C",
            1.0,
        ),
        recipe(
            "Recipe_NoMachine_C",
            &[("Desc_OreIron_C", 1.0)],
            &[("Desc_IronIngot_C", 1.0)],
            "Build_Missing_C",
            2.0,
        ),
        recipe(
            "Recipe_Broken_C",
            &[("Desc_Unobtainium_C", 1.0)],
            &[("Desc_IronIngot_C", 1.0)],
            "Build_SmelterMk1_C",
            2.0,
        ),
    ] {
        b.register_recipe(r).unwrap();
    }

    b.register_generator(Generator {
        id: GeneratorId::from("Build_GeneratorCoal_C"),
        name: "Coal Generator".to_string(),
        power: 75.0,
        fuels: vec![ItemId::from("Desc_Coal_C")],
    })
    .unwrap();
    b
}

pub fn sample_catalog() -> Catalog {
    sample_builder().build()
}

// ===========================================================================
// Node constructors
// ===========================================================================

/// Raw input supplying `speed` per minute.
pub fn resource_node(item: &str, speed: f64) -> NodeKind {
    NodeKind::Resource(SourceSinkData {
        item_id: Some(ItemId::from(item)),
        speed,
        io: IoMode::Out,
    })
}

pub fn item_node(item: &str, speed: f64, io: IoMode) -> NodeKind {
    NodeKind::Item(SourceSinkData {
        item_id: Some(ItemId::from(item)),
        speed,
        io,
    })
}

pub fn recipe_node(recipe: &str, machines: u32) -> NodeKind {
    NodeKind::Recipe(RecipeNodeData {
        recipe_id: Some(RecipeId::from(recipe)),
        clockspeed: ClockSpeed::NORMAL,
        machines,
    })
}

pub fn splitter() -> NodeKind {
    NodeKind::Logistic(LogisticData::Splitter)
}

pub fn merger() -> NodeKind {
    NodeKind::Logistic(LogisticData::Merger)
}

// ===========================================================================
// Snapshots
// ===========================================================================

/// Ore at 30/min through ingots, rods (2 machines) and screws (3 machines)
/// into a 120/min screw sink. Balanced on every edge.
pub fn screw_factory_snapshot() -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::new();
    snapshot
        .add_node("ore", &resource_node("Desc_OreIron_C", 30.0))
        .add_node("ingots", &recipe_node("Recipe_IngotIron_C", 1))
        .add_node("rods", &recipe_node("Recipe_IronRod_C", 2))
        .add_node("screw_line", &recipe_node("Recipe_Screw_C", 3))
        .add_node("screws", &item_node("Desc_IronScrew_C", 120.0, IoMode::In))
        .connect("e1", "ore", "right:solid:out:0", "ingots", "left:solid:in:0")
        .connect("e2", "ingots", "right:solid:out:0", "rods", "left:solid:in:0")
        .connect("e3", "rods", "right:solid:out:0", "screw_line", "left:solid:in:0")
        .connect("e4", "screw_line", "right:solid:out:0", "screws", "left:solid:in:0");
    snapshot
}

/// Ore feeding `len` splitters in a row through their right outputs. Each
/// splitter's top output feeds a smelter.
pub fn splitter_chain_snapshot(len: usize) -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::new();
    snapshot.add_node("ore", &resource_node("Desc_OreIron_C", 30.0 * len as f64));
    let mut upstream = ("ore".to_string(), "right:solid:out:0");
    for i in 0..len {
        let split = format!("split{i}");
        let smelt = format!("smelt{i}");
        snapshot
            .add_node(split.as_str(), &splitter())
            .add_node(smelt.as_str(), &recipe_node("Recipe_IngotIron_C", 1))
            .connect(
                format!("feed{i}"),
                upstream.0.as_str(),
                upstream.1,
                split.as_str(),
                "left:solid:in:0",
            )
            .connect(
                format!("tap{i}"),
                split.as_str(),
                "top:solid:out:0",
                smelt.as_str(),
                "left:solid:in:0",
            );
        upstream = (split, "right:solid:out:0");
    }
    snapshot
}
