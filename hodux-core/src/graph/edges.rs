//! Dependency Edges
//!
//! The graph is stored as two maps keyed by stable ids rather than by
//! references:
//!
//! - forward: target node -> key -> reactions that read it
//! - reverse: reaction -> the `(target, key)` pairs it read
//!
//! The reverse map makes dropping a reaction O(degree) and lets a rerun
//! discard its previous dependency set before tracking a fresh one.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::key::{Dependency, Key};
use crate::reactive::ReactionId;
use crate::store::NodeId;

/// Reactions selected by a lookup, in first-registered order, without
/// duplicates.
pub type Dependents = SmallVec<[ReactionId; 4]>;

/// Key-indexed dependency graph between store locations and reactions.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: HashMap<NodeId, HashMap<Key, IndexSet<ReactionId>>>,
    reverse: HashMap<ReactionId, HashSet<Dependency>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `reaction` read `key` on `target`.
    ///
    /// Returns false if the edge already existed.
    pub fn add_edge(&mut self, reaction: ReactionId, target: NodeId, key: Key) -> bool {
        let inserted = self
            .forward
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(reaction);

        if inserted {
            self.reverse
                .entry(reaction)
                .or_default()
                .insert(Dependency { target, key });
        }
        inserted
    }

    /// Remove every edge of `reaction`. Returns the number of edges removed.
    pub fn clear_reaction(&mut self, reaction: ReactionId) -> usize {
        let Some(deps) = self.reverse.remove(&reaction) else {
            return 0;
        };

        for dep in &deps {
            let Some(keys) = self.forward.get_mut(&dep.target) else {
                continue;
            };
            if let Some(readers) = keys.get_mut(&dep.key) {
                readers.shift_remove(&reaction);
                if readers.is_empty() {
                    keys.remove(&dep.key);
                }
            }
            if keys.is_empty() {
                self.forward.remove(&dep.target);
            }
        }
        deps.len()
    }

    /// Reactions registered against any of `keys` on `target`.
    pub fn dependents(&self, target: NodeId, keys: &[Key]) -> Dependents {
        let mut out = Dependents::new();
        let Some(by_key) = self.forward.get(&target) else {
            return out;
        };
        for key in keys {
            if let Some(readers) = by_key.get(key) {
                push_unique(&mut out, readers);
            }
        }
        out
    }

    /// Reactions registered against any key of `target`.
    pub fn all_dependents(&self, target: NodeId) -> Dependents {
        let mut out = Dependents::new();
        if let Some(by_key) = self.forward.get(&target) {
            for readers in by_key.values() {
                push_unique(&mut out, readers);
            }
        }
        out
    }

    /// Dependencies currently recorded for `reaction`.
    pub fn dependencies(&self, reaction: ReactionId) -> Vec<Dependency> {
        self.reverse
            .get(&reaction)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn dependency_count(&self, reaction: ReactionId) -> usize {
        self.reverse.get(&reaction).map_or(0, HashSet::len)
    }

    pub fn dependent_count(&self, target: NodeId, key: &Key) -> usize {
        self.forward
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map_or(0, IndexSet::len)
    }

    /// Number of reactions with at least one edge.
    pub fn reaction_count(&self) -> usize {
        self.reverse.len()
    }
}

fn push_unique(out: &mut Dependents, readers: &IndexSet<ReactionId>) {
    for id in readers {
        if !out.contains(id) {
            out.push(*id);
        }
    }
}
