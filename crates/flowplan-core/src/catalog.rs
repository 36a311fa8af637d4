//! Read-only view over the static game-data catalog.
//!
//! The catalog is assembled once through [`CatalogBuilder`] and then frozen.
//! The engine only ever borrows it.

use crate::id::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Physical state of an item as recorded in the game data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialForm {
    Solid,
    Liquid,
    Gas,
}

/// An item definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// `None` when the game data does not say.
    pub form: Option<MaterialForm>,
}

/// One ingredient or product of a recipe, per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub item: ItemId,
    pub amount: f64,
}

/// A recipe definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub ingredients: Vec<RecipeEntry>,
    pub products: Vec<RecipeEntry>,
    pub machine: MachineId,
    /// Base cycle duration in seconds at 100% clock.
    pub duration: f64,
}

/// A production machine definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionMachine {
    pub id: MachineId,
    pub name: String,
    /// Power draw in MW at 100% clock.
    pub power: f64,
}

/// A power generator definition. Carried for completeness; the flow engine
/// never looks at generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub id: GeneratorId,
    pub name: String,
    /// Power production in MW at 100% clock.
    pub power: f64,
    #[serde(default)]
    pub fuels: Vec<ItemId>,
}

/// A recipe entry naming something the catalog does not contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingRef {
    Item { recipe: RecipeId, item: ItemId },
    Machine { recipe: RecipeId, machine: MachineId },
}

/// Checks the textual shape of a catalog id: non-empty, no whitespace, no
/// control characters.
pub fn check_id(id: &str) -> Result<(), CatalogError> {
    if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CatalogError::MalformedId(id.to_string()));
    }
    Ok(())
}

/// Builder for constructing an immutable [`Catalog`].
/// Entries are registered, then `build()` freezes them.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    items: HashMap<ItemId, Item>,
    recipes: HashMap<RecipeId, Recipe>,
    machines: HashMap<MachineId, ProductionMachine>,
    generators: HashMap<GeneratorId, Generator>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_item(&mut self, item: Item) -> Result<&mut Self, CatalogError> {
        check_id(item.id.as_str())?;
        if self.items.contains_key(&item.id) {
            return Err(CatalogError::Duplicate(item.id.0));
        }
        self.items.insert(item.id.clone(), item);
        Ok(self)
    }

    pub fn register_recipe(&mut self, recipe: Recipe) -> Result<&mut Self, CatalogError> {
        check_id(recipe.id.as_str())?;
        if self.recipes.contains_key(&recipe.id) {
            return Err(CatalogError::Duplicate(recipe.id.0));
        }
        self.recipes.insert(recipe.id.clone(), recipe);
        Ok(self)
    }

    pub fn register_machine(&mut self, machine: ProductionMachine) -> Result<&mut Self, CatalogError> {
        check_id(machine.id.as_str())?;
        if self.machines.contains_key(&machine.id) {
            return Err(CatalogError::Duplicate(machine.id.0));
        }
        self.machines.insert(machine.id.clone(), machine);
        Ok(self)
    }

    pub fn register_generator(&mut self, generator: Generator) -> Result<&mut Self, CatalogError> {
        check_id(generator.id.as_str())?;
        if self.generators.contains_key(&generator.id) {
            return Err(CatalogError::Duplicate(generator.id.0));
        }
        self.generators.insert(generator.id.clone(), generator);
        Ok(self)
    }

    pub fn contains_item(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Freeze the catalog.
    ///
    /// Recipes may still name items or machines that were never registered:
    /// the engine treats those exactly like a node pointing at a deleted
    /// entry. Use [`Catalog::dangling_references`] to audit them.
    pub fn build(self) -> Catalog {
        Catalog {
            items: self.items,
            recipes: self.recipes,
            machines: self.machines,
            generators: self.generators,
        }
    }
}

/// Immutable catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<ItemId, Item>,
    recipes: HashMap<RecipeId, Recipe>,
    machines: HashMap<MachineId, ProductionMachine>,
    generators: HashMap<GeneratorId, Generator>,
}

impl Catalog {
    /// `Ok(None)` means the id is well formed but not in the catalog.
    pub fn lookup_item(&self, id: &str) -> Result<Option<&Item>, CatalogError> {
        check_id(id)?;
        Ok(self.items.get(id))
    }

    pub fn lookup_recipe(&self, id: &str) -> Result<Option<&Recipe>, CatalogError> {
        check_id(id)?;
        Ok(self.recipes.get(id))
    }

    pub fn lookup_machine(&self, id: &str) -> Result<Option<&ProductionMachine>, CatalogError> {
        check_id(id)?;
        Ok(self.machines.get(id))
    }

    pub fn lookup_generator(&self, id: &str) -> Result<Option<&Generator>, CatalogError> {
        check_id(id)?;
        Ok(self.generators.get(id))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn generator_count(&self) -> usize {
        self.generators.len()
    }

    /// Every recipe reference to an item or machine missing from the catalog,
    /// sorted by recipe id.
    pub fn dangling_references(&self) -> Vec<DanglingRef> {
        let mut recipes: Vec<&Recipe> = self.recipes.values().collect();
        recipes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut dangling = Vec::new();
        for recipe in recipes {
            for entry in recipe.ingredients.iter().chain(recipe.products.iter()) {
                if !self.items.contains_key(&entry.item) {
                    dangling.push(DanglingRef::Item {
                        recipe: recipe.id.clone(),
                        item: entry.item.clone(),
                    });
                }
            }
            if !self.machines.contains_key(&recipe.machine) {
                dangling.push(DanglingRef::Machine {
                    recipe: recipe.id.clone(),
                    machine: recipe.machine.clone(),
                });
            }
        }
        dangling
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed catalog id: {0:?}")]
    MalformedId(String),
    #[error("duplicate catalog id: {0}")]
    Duplicate(String),
}
