//! Dependency Graph
//!
//! Records which reactions read which store locations.
//!
//! # Overview
//!
//! The graph is bipartite: one side is `(raw node, key)` locations, the
//! other side is reactions. An edge means "this reaction read this key on
//! its most recent run".
//!
//! - Tracking adds edges while a reaction runs.
//! - Every run first discards the reaction's previous edges, so branches
//!   no longer taken stop triggering it.
//! - A write looks up the readers of the written key (plus the
//!   [`Key::Iterate`] readers for structural changes).
//!
//! Both directions are keyed by ids ([`NodeId`](crate::store::NodeId),
//! [`ReactionId`](crate::reactive::ReactionId)), so the graph holds no
//! references to reactions or nodes and never forms reference cycles.

mod edges;
mod key;

pub use edges::{DependencyGraph, Dependents};
pub use key::{Dependency, Key};
