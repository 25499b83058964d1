//! Raw-to-observable registry.
//!
//! Maps each raw node to its unique observable wrapper so that wrapping
//! the same node twice returns the same wrapper. Entries are weak: once
//! every handle to a wrapper is gone the entry is removed, and the node
//! can be wrapped afresh later.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::node::{Node, NodeId};
use super::observable::{Observable, ObservableInner};

static REGISTRY: OnceLock<DashMap<NodeId, Weak<ObservableInner>>> = OnceLock::new();

fn registry() -> &'static DashMap<NodeId, Weak<ObservableInner>> {
    REGISTRY.get_or_init(DashMap::new)
}

/// The unique wrapper of `node`, created on first request.
pub(crate) fn wrap(node: &Node) -> Observable {
    match registry().entry(node.id()) {
        Entry::Occupied(mut entry) => {
            if let Some(inner) = entry.get().upgrade() {
                return Observable(inner);
            }
            let fresh = Arc::new(ObservableInner::new(node.clone()));
            entry.insert(Arc::downgrade(&fresh));
            Observable(fresh)
        }
        Entry::Vacant(entry) => {
            let fresh = Arc::new(ObservableInner::new(node.clone()));
            entry.insert(Arc::downgrade(&fresh));
            Observable(fresh)
        }
    }
}

/// The existing wrapper of `node`, if one is alive.
pub(crate) fn lookup(node: &Node) -> Option<Observable> {
    registry()
        .get(&node.id())
        .and_then(|weak| weak.upgrade())
        .map(Observable)
}

/// Drop the entry for `id` unless it was already replaced by a live wrapper.
pub(crate) fn release(id: NodeId) {
    registry().remove_if(&id, |_, weak| weak.strong_count() == 0);
}
