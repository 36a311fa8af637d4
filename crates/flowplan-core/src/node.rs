//! Node kinds and their data payloads.
//!
//! The editor stores a node as a kind tag plus a free-form JSON payload.
//! [`NodeKind::decode`] turns that pair into a typed variant; everything
//! downstream dispatches on the variant with a `match`.

use crate::catalog::{Catalog, CatalogError, Recipe, RecipeEntry};
use crate::clock::ClockSpeed;
use crate::id::{ItemId, RecipeId};
use crate::port::{Form, Io, PortId, Side, SlotCounter};
use crate::resolver::{self, Inbound, Resolution, Unset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Which ports a resource/item node exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoMode {
    In,
    Out,
    #[default]
    Both,
}

/// Payload shared by resource (raw input) and item (sink/source) nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSinkData {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    /// Declared throughput in items per minute.
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub io: IoMode,
}

fn default_machines() -> u32 {
    1
}

/// Payload of a recipe (production machine) node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeNodeData {
    #[serde(default)]
    pub recipe_id: Option<RecipeId>,
    #[serde(default)]
    pub clockspeed: ClockSpeed,
    /// Identical machines running this recipe in parallel.
    #[serde(default = "default_machines")]
    pub machines: u32,
}

impl Default for RecipeNodeData {
    fn default() -> Self {
        Self {
            recipe_id: None,
            clockspeed: ClockSpeed::default(),
            machines: default_machines(),
        }
    }
}

/// What a smart/programmable splitter output rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFilter {
    Any,
    Overflow,
    None,
    Item(ItemId),
}

impl RuleFilter {
    /// Whether an output with this rule takes a share of unfiltered flow.
    pub fn takes_remainder(&self) -> bool {
        matches!(self, RuleFilter::Any | RuleFilter::Overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRule {
    pub side: Side,
    pub filter: RuleFilter,
}

/// Per-side direction of a pipe junction. Unset sides are outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionSides {
    #[serde(default)]
    pub left: Option<Io>,
    #[serde(default)]
    pub top: Option<Io>,
    #[serde(default)]
    pub right: Option<Io>,
    #[serde(default)]
    pub bottom: Option<Io>,
}

impl JunctionSides {
    pub fn io(&self, side: Side) -> Io {
        let configured = match side {
            Side::Left => self.left,
            Side::Top => self.top,
            Side::Right => self.right,
            Side::Bottom => self.bottom,
        };
        configured.unwrap_or(Io::Out)
    }
}

/// Payload of a logistics node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogisticData {
    Splitter,
    Merger,
    SmartSplitter {
        #[serde(default)]
        rules: Vec<OutputRule>,
    },
    ProgrammableSplitter {
        #[serde(default)]
        rules: Vec<OutputRule>,
    },
    PipeJunction {
        #[serde(default)]
        sides: JunctionSides,
    },
}

impl LogisticData {
    /// Fixed port topology; every logistics port uses slot 0.
    pub fn ports(&self) -> Vec<PortId> {
        match self {
            LogisticData::PipeJunction { sides } => Side::ALL
                .iter()
                .map(|&side| PortId::new(side, Form::Fluid, sides.io(side), 0))
                .collect(),
            LogisticData::Merger => Side::ALL
                .iter()
                .map(|&side| {
                    let io = if side == Side::Right { Io::Out } else { Io::In };
                    PortId::new(side, Form::Solid, io, 0)
                })
                .collect(),
            LogisticData::Splitter
            | LogisticData::SmartSplitter { .. }
            | LogisticData::ProgrammableSplitter { .. } => Side::ALL
                .iter()
                .map(|&side| {
                    let io = if side == Side::Left { Io::In } else { Io::Out };
                    PortId::new(side, Form::Solid, io, 0)
                })
                .collect(),
        }
    }

    /// Output rules, for the splitter variants that have them.
    pub fn rules(&self) -> Option<&[OutputRule]> {
        match self {
            LogisticData::SmartSplitter { rules } | LogisticData::ProgrammableSplitter { rules } => {
                Some(rules)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node kind
// ---------------------------------------------------------------------------

/// A node's kind together with its decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Resource(SourceSinkData),
    Item(SourceSinkData),
    Recipe(RecipeNodeData),
    Logistic(LogisticData),
}

impl NodeKind {
    pub const RESOURCE: &'static str = "resource";
    pub const ITEM: &'static str = "item";
    pub const RECIPE: &'static str = "recipe";
    pub const LOGISTIC: &'static str = "logistic";

    /// Decode an editor kind tag and payload.
    pub fn decode(tag: &str, data: &Value) -> Result<NodeKind, NodeDataError> {
        let malformed = |e: serde_json::Error| NodeDataError::Malformed {
            kind: tag.to_string(),
            detail: e.to_string(),
        };
        match tag {
            Self::RESOURCE => SourceSinkData::deserialize(data)
                .map(NodeKind::Resource)
                .map_err(malformed),
            Self::ITEM => SourceSinkData::deserialize(data)
                .map(NodeKind::Item)
                .map_err(malformed),
            Self::RECIPE => RecipeNodeData::deserialize(data)
                .map(NodeKind::Recipe)
                .map_err(malformed),
            Self::LOGISTIC => LogisticData::deserialize(data)
                .map(NodeKind::Logistic)
                .map_err(malformed),
            other => Err(NodeDataError::UnknownKind(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Resource(_) => Self::RESOURCE,
            NodeKind::Item(_) => Self::ITEM,
            NodeKind::Recipe(_) => Self::RECIPE,
            NodeKind::Logistic(_) => Self::LOGISTIC,
        }
    }

    /// The editor payload for this kind.
    pub fn encode(&self) -> Value {
        let encoded = match self {
            NodeKind::Resource(data) | NodeKind::Item(data) => serde_json::to_value(data),
            NodeKind::Recipe(data) => serde_json::to_value(data),
            NodeKind::Logistic(data) => serde_json::to_value(data),
        };
        encoded.unwrap_or(Value::Null)
    }

    /// Logistics nodes are the only kind whose flows depend on neighbours.
    pub fn is_logistic(&self) -> bool {
        matches!(self, NodeKind::Logistic(_))
    }

    /// Derive the node's ordered port list.
    pub fn ports(&self, catalog: &Catalog) -> Result<Vec<PortId>, Unset> {
        match self {
            NodeKind::Resource(data) | NodeKind::Item(data) => source_sink_ports(data, catalog),
            NodeKind::Recipe(data) => {
                let recipe = resolver::lookup_recipe(data, catalog)?;
                Ok(recipe_bindings(recipe, catalog)?
                    .into_iter()
                    .map(|binding| binding.port)
                    .collect())
            }
            NodeKind::Logistic(data) => Ok(data.ports()),
        }
    }

    /// Resolve the node's per-port flows. `inbound` is only read by
    /// logistics nodes.
    pub fn resolve(&self, catalog: &Catalog, inbound: &Inbound) -> Result<Resolution, Unset> {
        match self {
            NodeKind::Resource(data) | NodeKind::Item(data) => {
                resolver::resolve_source_sink(data, catalog)
            }
            NodeKind::Recipe(data) => resolver::resolve_recipe(data, catalog),
            NodeKind::Logistic(data) => Ok(resolver::resolve_logistic(data, inbound)),
        }
    }
}

// ---------------------------------------------------------------------------
// Port derivation
// ---------------------------------------------------------------------------

/// Map a catalog lookup onto the resolver's unset reasons.
pub(crate) fn found<T>(
    lookup: Result<Option<T>, CatalogError>,
    missing: impl FnOnce() -> Unset,
) -> Result<T, Unset> {
    match lookup {
        Ok(Some(found)) => Ok(found),
        Ok(None) => Err(missing()),
        Err(CatalogError::MalformedId(id) | CatalogError::Duplicate(id)) => {
            Err(Unset::MalformedId(id))
        }
    }
}

/// Resource/item ports: `left:<form>:in:0` and/or `right:<form>:out:0`.
pub fn source_sink_ports(data: &SourceSinkData, catalog: &Catalog) -> Result<Vec<PortId>, Unset> {
    let item_id = data.item_id.as_ref().ok_or(Unset::NothingSelected)?;
    let item = found(catalog.lookup_item(item_id.as_str()), || {
        Unset::MissingItem(item_id.clone())
    })?;
    let form = Form::of_item(item);

    let inbound = PortId::new(Side::Left, form, Io::In, 0);
    let outbound = PortId::new(Side::Right, form, Io::Out, 0);
    Ok(match data.io {
        IoMode::In => vec![inbound],
        IoMode::Out => vec![outbound],
        IoMode::Both => vec![inbound, outbound],
    })
}

/// A recipe port and the ingredient or product it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct PortBinding<'c> {
    pub port: PortId,
    pub entry: &'c RecipeEntry,
}

/// Ingredients bind to the left, products to the right, each taking the next
/// free slot for its `(form, io)`. Any entry whose item is missing aborts the
/// whole derivation.
pub fn recipe_bindings<'c>(
    recipe: &'c Recipe,
    catalog: &Catalog,
) -> Result<Vec<PortBinding<'c>>, Unset> {
    let mut slots = SlotCounter::default();
    let sides = recipe
        .ingredients
        .iter()
        .map(|entry| (Side::Left, Io::In, entry))
        .chain(recipe.products.iter().map(|entry| (Side::Right, Io::Out, entry)));

    let mut bindings = Vec::with_capacity(recipe.ingredients.len() + recipe.products.len());
    for (side, io, entry) in sides {
        let item = found(catalog.lookup_item(entry.item.as_str()), || {
            Unset::MissingItem(entry.item.clone())
        })?;
        let form = Form::of_item(item);
        let slot = slots
            .next(form, io)
            .ok_or_else(|| Unset::TooManyPorts(recipe.id.clone()))?;
        bindings.push(PortBinding {
            port: PortId::new(side, form, io, slot),
            entry,
        });
    }
    Ok(bindings)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeDataError {
    #[error("unknown node kind: {0:?}")]
    UnknownKind(String),
    #[error("malformed {kind} node data: {detail}")]
    Malformed { kind: String, detail: String },
}
