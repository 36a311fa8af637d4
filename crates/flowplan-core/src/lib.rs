//! Flowplan Core -- the flow computation engine for factory production plans.
//!
//! Given a read-only game-data [`catalog::Catalog`] and a snapshot of the
//! planner's node graph, the engine derives every node's ports, computes the
//! signed items-per-minute flow at each port, and checks that every
//! connection balances.
//!
//! # Sign Convention
//!
//! A flow is positive when the port supplies the item and negative when it
//! consumes it. Each port reports its *own* flow; the port on the far end of
//! a connection sees the negation ([`resolver::Flow::as_seen_by_peer`]). A
//! balanced connection therefore sums to zero per item.
//!
//! # Pass Structure
//!
//! [`propagate::compute_flows`] runs one pass:
//!
//! 1. **Index** -- Decode node payloads and attach edges to ports.
//! 2. **Independent nodes** -- Resources, items, and recipes resolve on their own.
//! 3. **Logistics** -- Splitters, mergers, and pipe junctions redistribute
//!    their neighbours' flows, iterated to a bounded fixpoint.
//! 4. **Validation** -- Edges are checked for form, direction, item, and
//!    balance faults.
//!
//! Faults never abort a pass. They are collected as
//! [`diagnostic::Diagnostic`]s next to the best-effort flows in the
//! [`report::FlowReport`].
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable item/recipe/machine/generator tables.
//! - [`clock::ClockSpeed`] -- Scaled-integer machine clock rate.
//! - [`port::PortId`] -- `side:form:io:slot` port address.
//! - [`node::NodeKind`] -- Node kind plus decoded payload.
//! - [`graph::GraphSnapshot`] -- The editor's node/edge document.
//! - [`config::EngineConfig`] -- Tolerance and iteration bound.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod diagnostic;
pub mod graph;
pub mod id;
pub mod node;
pub mod port;
pub mod propagate;
pub mod report;
pub mod resolver;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use catalog::{Catalog, CatalogBuilder};
pub use config::EngineConfig;
pub use diagnostic::Diagnostic;
pub use graph::GraphSnapshot;
pub use propagate::compute_flows;
pub use report::FlowReport;
