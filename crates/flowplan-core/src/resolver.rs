//! Per-node flow resolution.
//!
//! Every resolver is a pure function of the node payload, the catalog and
//! (for logistics nodes only) the flows currently reported by connected
//! neighbours. A resolver either produces a flow list for each derived port
//! or reports the node as [`Unset`]; it never fails the whole computation.

use crate::catalog::{Catalog, Recipe};
use crate::clock::ClockSpeed;
use crate::id::{ItemId, MachineId, RecipeId};
use crate::node::{
    LogisticData, RecipeNodeData, SourceSinkData, found, recipe_bindings, source_sink_ports,
};
use crate::port::{Io, PortId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net amounts smaller than this are treated as balanced and not distributed.
const NET_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// A signed rate, in items per minute, of one item at one port.
///
/// Positive means the port supplies the item, negative means it consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub item: ItemId,
    pub speed: f64,
}

impl Flow {
    pub fn new(item: impl Into<ItemId>, speed: f64) -> Self {
        Self {
            item: item.into(),
            speed,
        }
    }

    /// The same flow as the port on the other end of a connection sees it.
    pub fn as_seen_by_peer(&self) -> Flow {
        Flow {
            item: self.item.clone(),
            speed: -self.speed,
        }
    }
}

/// A derived port and the flows it owns. An empty flow list means the flow
/// through the port is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPort {
    pub id: PortId,
    pub flows: Vec<Flow>,
}

impl ResolvedPort {
    pub fn new(id: PortId, flows: Vec<Flow>) -> Self {
        Self { id, flows }
    }

    pub fn own(&self) -> &[Flow] {
        &self.flows
    }

    pub fn as_seen_by_peer(&self) -> Vec<Flow> {
        self.flows.iter().map(Flow::as_seen_by_peer).collect()
    }

    pub fn is_known(&self) -> bool {
        !self.flows.is_empty()
    }
}

/// Flows reported by connected neighbours, keyed by this node's own port id.
pub type Inbound = BTreeMap<PortId, Vec<Flow>>;

/// Successful resolution of one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub ports: Vec<ResolvedPort>,
    /// Faults recorded while resolving; the ports are still best effort.
    pub issues: Vec<ResolveIssue>,
}

/// A non-fatal fault recorded by a logistics resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolveIssue {
    /// A pipe junction saw more than one fluid.
    MixedFluids { items: Vec<ItemId> },
    /// Net inventory had no remaining port to go to and was dropped.
    NoDestination { item: ItemId, speed: f64 },
}

/// Why a node could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Unset {
    #[error("no item or recipe selected")]
    NothingSelected,
    #[error("malformed catalog id {0:?}")]
    MalformedId(String),
    #[error("item {0} is not in the catalog")]
    MissingItem(ItemId),
    #[error("recipe {0} is not in the catalog")]
    MissingRecipe(RecipeId),
    #[error("machine {0} is not in the catalog")]
    MissingMachine(MachineId),
    #[error("clock speed {:.3}% is outside 1%..=250%", .0.percent())]
    ClockOutOfRange(ClockSpeed),
    #[error("recipe {0} has a non-positive duration")]
    InvalidDuration(RecipeId),
    #[error("declared speed {0} is negative or not finite")]
    InvalidSpeed(String),
    #[error("recipe {0} needs more than 256 ports of one form and direction")]
    TooManyPorts(RecipeId),
}

// ---------------------------------------------------------------------------
// Resource / item
// ---------------------------------------------------------------------------

/// `out` ports supply the declared speed, `in` ports consume it.
///
/// The declared speed is a rate, not a signed flow: a sink entered as 45/min
/// still consumes. It is stored on every port with the port's own sign, so a
/// node in `both` mode carries +45 on `out` and -45 on `in`. Negative or
/// non-finite declarations are left unset instead of being reinterpreted.
pub fn resolve_source_sink(data: &SourceSinkData, catalog: &Catalog) -> Result<Resolution, Unset> {
    let ports = source_sink_ports(data, catalog)?;
    let item = data.item_id.clone().ok_or(Unset::NothingSelected)?;
    if !data.speed.is_finite() || data.speed < 0.0 {
        return Err(Unset::InvalidSpeed(data.speed.to_string()));
    }

    let ports = ports
        .into_iter()
        .map(|id| {
            let speed = match id.io {
                Io::Out => data.speed,
                Io::In => -data.speed,
            };
            ResolvedPort::new(id, vec![Flow::new(item.clone(), speed)])
        })
        .collect();
    Ok(Resolution {
        ports,
        issues: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

pub(crate) fn lookup_recipe<'c>(data: &RecipeNodeData, catalog: &'c Catalog) -> Result<&'c Recipe, Unset> {
    let recipe_id = data.recipe_id.as_ref().ok_or(Unset::NothingSelected)?;
    found(catalog.lookup_recipe(recipe_id.as_str()), || {
        Unset::MissingRecipe(recipe_id.clone())
    })
}

/// Ingredients consume `amount / minutes`, products supply it, scaled by the
/// machine count.
pub fn resolve_recipe(data: &RecipeNodeData, catalog: &Catalog) -> Result<Resolution, Unset> {
    let recipe = lookup_recipe(data, catalog)?;
    found(catalog.lookup_machine(recipe.machine.as_str()), || {
        Unset::MissingMachine(recipe.machine.clone())
    })?;
    if !data.clockspeed.is_valid() {
        return Err(Unset::ClockOutOfRange(data.clockspeed));
    }
    if !(recipe.duration.is_finite() && recipe.duration > 0.0) {
        return Err(Unset::InvalidDuration(recipe.id.clone()));
    }

    let minutes = recipe.duration / data.clockspeed.decimal() / 60.0;
    let machines = f64::from(data.machines);
    let ports = recipe_bindings(recipe, catalog)?
        .into_iter()
        .map(|binding| {
            let rate = binding.entry.amount * machines / minutes;
            let speed = match binding.port.io {
                Io::In => -rate,
                Io::Out => rate,
            };
            ResolvedPort::new(binding.port, vec![Flow::new(binding.entry.item.clone(), speed)])
        })
        .collect();
    Ok(Resolution {
        ports,
        issues: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Logistics
// ---------------------------------------------------------------------------

/// Redistribute the flows reported by connected neighbours.
///
/// Ports with known peer flows mirror them. The per-item net of those peer
/// flows is then shared evenly: supply across the remaining `out` ports,
/// demand across the remaining `in` ports. Smart and programmable splitters
/// only hand remainder flow to outputs with an `any` or `overflow` rule.
pub fn resolve_logistic(data: &LogisticData, inbound: &Inbound) -> Resolution {
    let ports = data.ports();
    let mut resolved: Vec<ResolvedPort> = Vec::with_capacity(ports.len());
    let mut inventory: BTreeMap<ItemId, f64> = BTreeMap::new();
    let mut remaining_in = Vec::new();
    let mut remaining_out = Vec::new();

    for (index, port) in ports.iter().enumerate() {
        match inbound.get(port).filter(|flows| !flows.is_empty()) {
            Some(peer) => {
                for flow in peer {
                    *inventory.entry(flow.item.clone()).or_insert(0.0) += flow.speed;
                }
                resolved.push(ResolvedPort::new(
                    *port,
                    peer.iter().map(Flow::as_seen_by_peer).collect(),
                ));
            }
            None => {
                match port.io {
                    Io::In => remaining_in.push(index),
                    Io::Out if takes_remainder(data, port) => remaining_out.push(index),
                    Io::Out => {}
                }
                resolved.push(ResolvedPort::new(*port, Vec::new()));
            }
        }
    }
    inventory.retain(|_, net| net.abs() > NET_EPSILON);

    let mut issues = Vec::new();
    if matches!(data, LogisticData::PipeJunction { .. }) && inventory.len() > 1 {
        let items: Vec<ItemId> = inventory.into_keys().collect();
        issues.push(ResolveIssue::MixedFluids { items });
        return Resolution {
            ports: resolved,
            issues,
        };
    }

    for (item, net) in inventory {
        let targets = if net > 0.0 { &remaining_out } else { &remaining_in };
        if targets.is_empty() {
            issues.push(ResolveIssue::NoDestination { item, speed: net });
            continue;
        }
        let share = net / targets.len() as f64;
        for &index in targets {
            resolved[index].flows.push(Flow::new(item.clone(), share));
        }
    }

    Resolution {
        ports: resolved,
        issues,
    }
}

/// Whether an unconnected `out` port may receive leftover inventory. Asked
/// once per port, so several remainder rules on one side still earn that side
/// a single share.
fn takes_remainder(data: &LogisticData, port: &PortId) -> bool {
    match data.rules() {
        Some(rules) => rules
            .iter()
            .any(|rule| rule.side == port.side && rule.filter.takes_remainder()),
        None => true,
    }
}
