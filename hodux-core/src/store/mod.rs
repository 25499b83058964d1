//! Observable Store
//!
//! Raw containers ([`Node`]) and their intercepting views
//! ([`Observable`]).
//!
//! # Overview
//!
//! - [`create_store`] turns a plain object into its observable view. A
//!   node has exactly one observable while any handle to it is alive, so
//!   calling it twice with the same data returns the same store.
//! - Nested containers are wrapped lazily when read through a store.
//! - [`unwrap`] recovers the raw node for untracked access.

mod node;
mod observable;
mod registry;

pub use node::{Node, NodeData, NodeId, NodeKind};
pub use observable::Observable;

use tracing::debug;

use crate::error::{Error, Result};
use crate::value::Value;

/// A top-level observable created by [`create_store`].
pub type Store = Observable;

/// Create (or retrieve) the observable view of a plain object.
///
/// Passing an existing store returns it unchanged. Anything other than a
/// plain object is rejected with [`Error::InvalidModel`].
///
/// ```rust,ignore
/// let store = create_store(json!({ "n": 0 }))?;
/// assert_eq!(create_store(store.clone())?, store);
/// ```
pub fn create_store(model: impl Into<Value>) -> Result<Store> {
    let model = model.into();
    match &model {
        Value::Observable(obs) if obs.kind() == NodeKind::Object => Ok(obs.clone()),
        Value::Node(node) if node.kind() == NodeKind::Object => {
            let existing = registry::lookup(node);
            let store = existing.clone().unwrap_or_else(|| registry::wrap(node));
            if existing.is_none() {
                debug!(node = %node.id(), keys = node.len(), "store created");
            }
            Ok(store)
        }
        other => Err(Error::InvalidModel {
            found: other.type_name(),
        }),
    }
}

/// Whether `value` is an observable view.
pub fn is_observable(value: &Value) -> bool {
    matches!(value, Value::Observable(_))
}

/// The raw node behind an observable.
///
/// Reads and writes on the returned node are invisible to reactions.
pub fn unwrap(value: &Value) -> Result<Node> {
    match value {
        Value::Observable(obs) => Ok(obs.node().clone()),
        other => Err(Error::NotObservable {
            found: other.type_name(),
        }),
    }
}
