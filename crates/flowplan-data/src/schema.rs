//! Serde data file structs for catalog definitions.
//!
//! These mirror the on-disk format of the catalog tables and are converted
//! into engine types by the loader.

use flowplan_core::catalog::{
    Generator, Item, MaterialForm, ProductionMachine, Recipe, RecipeEntry,
};
use flowplan_core::id::{GeneratorId, ItemId, MachineId, RecipeId};
use serde::Deserialize;

// ===========================================================================
// Items
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub id: String,
    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub form: Option<MaterialForm>,
}

impl From<ItemData> for Item {
    fn from(data: ItemData) -> Self {
        Item {
            name: data.name.unwrap_or_else(|| data.id.clone()),
            id: ItemId::from(data.id),
            form: data.form,
        }
    }
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe ingredient or product, in short tuple form or full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntryData {
    /// Short form: `("item_id", amount)`.
    Short(String, f64),
    Full { item: String, amount: f64 },
}

impl From<EntryData> for RecipeEntry {
    fn from(data: EntryData) -> Self {
        let (item, amount) = match data {
            EntryData::Short(item, amount) => (item, amount),
            EntryData::Full { item, amount } => (item, amount),
        };
        RecipeEntry {
            item: ItemId::from(item),
            amount,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<EntryData>,
    #[serde(default)]
    pub products: Vec<EntryData>,
    pub machine: String,
    /// Seconds per cycle at 100% clock.
    pub duration: f64,
}

impl From<RecipeData> for Recipe {
    fn from(data: RecipeData) -> Self {
        Recipe {
            name: data.name.unwrap_or_else(|| data.id.clone()),
            id: RecipeId::from(data.id),
            ingredients: data.ingredients.into_iter().map(RecipeEntry::from).collect(),
            products: data.products.into_iter().map(RecipeEntry::from).collect(),
            machine: MachineId::from(data.machine),
            duration: data.duration,
        }
    }
}

// ===========================================================================
// Machines and generators
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub power: f64,
}

impl From<MachineData> for ProductionMachine {
    fn from(data: MachineData) -> Self {
        ProductionMachine {
            name: data.name.unwrap_or_else(|| data.id.clone()),
            id: MachineId::from(data.id),
            power: data.power,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub power: f64,
    #[serde(default)]
    pub fuels: Vec<String>,
}

impl From<GeneratorData> for Generator {
    fn from(data: GeneratorData) -> Self {
        Generator {
            name: data.name.unwrap_or_else(|| data.id.clone()),
            id: GeneratorId::from(data.id),
            power: data.power,
            fuels: data.fuels.into_iter().map(ItemId::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_name_defaults_to_id() {
        let data: ItemData = serde_json::from_str(r#"{"id": "Desc_Water_C", "form": "liquid"}"#).unwrap();
        let item = Item::from(data);
        assert_eq!(item.name, "Desc_Water_C");
        assert_eq!(item.form, Some(MaterialForm::Liquid));
    }

    #[test]
    fn entries_accept_short_and_full_form() {
        let data: RecipeData = serde_json::from_str(
            r#"{
                "id": "Recipe_Screw_C",
                "ingredients": [["Desc_IronRod_C", 1]],
                "products": [{"item": "Desc_IronScrew_C", "amount": 4}],
                "machine": "Build_ConstructorMk1_C",
                "duration": 6
            }"#,
        )
        .unwrap();
        let recipe = Recipe::from(data);
        assert_eq!(recipe.ingredients[0].item, ItemId::from("Desc_IronRod_C"));
        assert_eq!(recipe.products[0].amount, 4.0);
        assert_eq!(recipe.duration, 6.0);
    }

    #[test]
    fn ron_tuple_entries() {
        let data: RecipeData = ron::from_str(
            r#"(
                id: "Recipe_IngotIron_C",
                name: Some("Iron Ingot"),
                ingredients: [("Desc_OreIron_C", 1.0)],
                products: [("Desc_IronIngot_C", 1.0)],
                machine: "Build_SmelterMk1_C",
                duration: 2.0,
            )"#,
        )
        .unwrap();
        let recipe = Recipe::from(data);
        assert_eq!(recipe.name, "Iron Ingot");
        assert_eq!(recipe.products[0].item, ItemId::from("Desc_IronIngot_C"));
    }

    #[test]
    fn generator_fuels_are_optional() {
        let data: GeneratorData =
            toml::from_str("id = \"Build_GeneratorBiomass_C\"\npower = 30.0\n").unwrap();
        let generator = Generator::from(data);
        assert!(generator.fuels.is_empty());
        assert_eq!(generator.power, 30.0);
    }
}
