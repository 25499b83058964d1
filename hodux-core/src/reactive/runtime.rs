//! Reactive Runtime
//!
//! The runtime connects observable reads and writes to reactions through
//! the dependency graph.
//!
//! # How It Works
//!
//! 1. When a reaction is created, it registers with the runtime.
//!
//! 2. When a running reaction reads through an observable, the runtime
//!    records a `(node, key) -> reaction` edge ([`Runtime::track`]).
//!
//! 3. When a write changes a stored value, the runtime ([`Runtime::trigger`]):
//!    a. Looks up the readers of the written key (and of `Iterate` for
//!       structural changes, or of every key for a clear)
//!    b. Reports the write to each reader's debugger sink
//!    c. Hands each reader to the batching coordinator, which either
//!       notifies it now or queues it until the outermost batch closes
//!
//! # Thread Safety
//!
//! The graph and the reaction registry are process-wide and guarded by
//! mutexes that are never held while user code (bodies, schedulers,
//! sinks) runs. The running-reaction stack is thread-local.

use std::collections::HashMap;
use std::sync::{OnceLock, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::batch;
use super::context::ReactiveContext;
use super::debug::{DebugEvent, Operation};
use super::reaction::{Reaction, ReactionInner};
use super::subscriber::ReactionId;
use crate::error::{Error, Result};
use crate::graph::{Dependency, DependencyGraph, Key};
use crate::store::Node;

/// The global reactive runtime.
pub struct Runtime;

// Registry of live reactions. Weak so that dropping the last handle of a
// reaction is enough to retire it.
static REGISTRY: OnceLock<Mutex<HashMap<ReactionId, Weak<ReactionInner>>>> = OnceLock::new();
static GRAPH: OnceLock<Mutex<DependencyGraph>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<ReactionId, Weak<ReactionInner>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn graph() -> &'static Mutex<DependencyGraph> {
    GRAPH.get_or_init(|| Mutex::new(DependencyGraph::new()))
}

impl Runtime {
    pub(crate) fn register(reaction: &Reaction) {
        registry()
            .lock()
            .insert(reaction.id(), std::sync::Arc::downgrade(&reaction.0));
    }

    pub(crate) fn unregister(id: ReactionId) {
        registry().lock().remove(&id);
        graph().lock().clear_reaction(id);
    }

    /// Record that the running reaction read `key` on `target`.
    ///
    /// Outside a running reaction this is a no-op.
    pub fn track(target: &Node, key: Key, op: Operation) {
        let Some(reaction) = ReactiveContext::current() else {
            return;
        };
        if reaction.is_disposed() {
            return;
        }

        let added = graph().lock().add_edge(reaction.id(), target.id(), key.clone());
        if added {
            trace!(reaction = %reaction.id(), target = %target.id(), key = %key, op = %op, "tracked");
        }
        reaction.debug(&DebugEvent::read(op, target, &key));
    }

    /// Notify every reaction that depends on the location `event` wrote.
    ///
    /// Every selected reaction is notified even if an earlier one fails;
    /// the first failure is returned.
    pub fn trigger(event: DebugEvent) -> Result<()> {
        let target = event.target.id();
        let ids = {
            let graph = graph().lock();
            match (&event.op, &event.key) {
                (Operation::Clear, _) => graph.all_dependents(target),
                (Operation::Add | Operation::Delete, Some(key)) => {
                    graph.dependents(target, &[key.clone(), Key::Iterate])
                }
                (_, Some(key)) => graph.dependents(target, std::slice::from_ref(key)),
                (_, None) => graph.dependents(target, &[Key::Iterate]),
            }
        };
        if ids.is_empty() {
            return Ok(());
        }

        let reactions: SmallVec<[Reaction; 4]> = {
            let registry = registry().lock();
            ids.iter()
                .filter_map(|id| registry.get(id).and_then(Weak::upgrade))
                .map(Reaction)
                .collect()
        };
        trace!(
            target = %target,
            key = ?event.key,
            op = %event.op,
            fan_out = reactions.len(),
            "trigger"
        );

        let mut first_error: Option<Error> = None;
        for reaction in &reactions {
            if reaction.is_disposed() {
                continue;
            }
            reaction.debug(&event);
            if let Err(err) = batch::schedule(reaction) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Dispose `reaction`: mark it and drop all of its edges.
    pub fn dispose(reaction: &Reaction) {
        if reaction.mark_disposed() {
            let removed = graph().lock().clear_reaction(reaction.id());
            debug!(reaction = %reaction.id(), edges = removed, "reaction disposed");
        }
    }

    /// Remove all dependencies of a reaction.
    ///
    /// Called before every run so the run records a fresh set.
    pub fn clear_dependencies(id: ReactionId) {
        graph().lock().clear_reaction(id);
    }

    pub fn dependency_count(id: ReactionId) -> usize {
        graph().lock().dependency_count(id)
    }

    pub fn dependencies(id: ReactionId) -> Vec<Dependency> {
        graph().lock().dependencies(id)
    }

    /// Number of reactions currently registered against `key` on `target`.
    pub fn dependent_count(target: &Node, key: &Key) -> usize {
        graph().lock().dependent_count(target.id(), key)
    }

    /// Get the reaction reads are currently attributed to, if any.
    pub fn current_reaction() -> Option<ReactionId> {
        ReactiveContext::current_id()
    }

    /// Check if we're inside a tracking context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}
