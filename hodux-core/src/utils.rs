//! Equality and snapshot helpers.
//!
//! The selector binding compares the previous selection against the fresh
//! one with an equality function. Three are provided:
//!
//! - [`ref_equal`]: identity, the default.
//! - [`shallow_equal`]: one level of container contents, the default of
//!   [`connect`](crate::binding::connect).
//! - [`deep_equal`]: full structural comparison.
//!
//! [`try_clone`] takes the snapshot the comparison runs against.
//!
//! Comparisons read raw data and never track. Cloning through an
//! observable does track, so a snapshot of a whole object subscribes to
//! every key it copies.

use std::collections::{HashMap, HashSet};

use crate::store::{Node, NodeData, NodeId, NodeKind};
use crate::value::Value;

/// Identity equality (`Object.is` for numbers, pointer for containers).
pub fn ref_equal(a: &Value, b: &Value) -> bool {
    a == b
}

/// Equal by identity, or containers of the same kind whose direct
/// contents are identical.
///
/// An observable and its own raw node are equal.
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    let (Some(left), Some(right)) = (a.node(), b.node()) else {
        return false;
    };
    if left.ptr_eq(right) {
        return true;
    }
    if left.kind() != right.kind() {
        return false;
    }

    match (left.snapshot(), right.snapshot()) {
        (NodeData::Object(x), NodeData::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| v == w))
        }
        (NodeData::Array(x), NodeData::Array(y)) => x == y,
        (NodeData::Set(x), NodeData::Set(y)) => {
            x.len() == y.len() && x.iter().all(|member| y.contains(member))
        }
        (NodeData::Map(x), NodeData::Map(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| v == w))
        }
        _ => false,
    }
}

/// Structural equality at every depth. Cycles are handled.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    deep_equal_in(a, b, &mut HashSet::new())
}

fn deep_equal_in(a: &Value, b: &Value, seen: &mut HashSet<(NodeId, NodeId)>) -> bool {
    let (left, right) = match (a.node(), b.node()) {
        (Some(left), Some(right)) => (left, right),
        (None, None) => return a == b,
        _ => return false,
    };
    if left.ptr_eq(right) {
        return true;
    }
    if left.kind() != right.kind() || left.len() != right.len() {
        return false;
    }
    // A pair already under comparison is assumed equal.
    if !seen.insert((left.id(), right.id())) {
        return true;
    }

    match (left.snapshot(), right.snapshot()) {
        (NodeData::Object(x), NodeData::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| deep_equal_in(v, w, seen)))
        }
        (NodeData::Array(x), NodeData::Array(y)) => {
            x.len() == y.len() && x.iter().zip(&y).all(|(v, w)| deep_equal_in(v, w, seen))
        }
        (NodeData::Set(x), NodeData::Set(y)) => {
            x.len() == y.len()
                && x.iter().all(|member| {
                    y.contains(member) || y.iter().any(|other| deep_equal_in(member, other, seen))
                })
        }
        (NodeData::Map(x), NodeData::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| deep_equal_in(v, w, seen)))
        }
        _ => false,
    }
}

type Copies = HashMap<NodeId, Node>;

/// Snapshot a selection.
///
/// Plain objects and arrays are copied at every depth into fresh raw
/// nodes; shared sub-structure and cycles are preserved. Sets, maps,
/// opaque values and primitives are returned as they are.
pub fn try_clone(value: &Value) -> Value {
    clone_in(value, &mut Copies::new())
}

fn clone_in(value: &Value, copies: &mut Copies) -> Value {
    match value {
        Value::Observable(obs) => match obs.kind() {
            NodeKind::Object => copy_into(obs.id(), NodeKind::Object, copies, |copies| {
                NodeData::Object(
                    obs.entries()
                        .into_iter()
                        .filter_map(|(k, v)| match k {
                            Value::String(name) => Some((name, clone_in(&v, copies).into_raw())),
                            _ => None,
                        })
                        .collect(),
                )
            }),
            NodeKind::Array => copy_into(obs.id(), NodeKind::Array, copies, |copies| {
                NodeData::Array(
                    obs.values()
                        .iter()
                        .map(|v| clone_in(v, copies).into_raw())
                        .collect(),
                )
            }),
            NodeKind::Set | NodeKind::Map => value.clone(),
        },
        Value::Node(node) => match node.kind() {
            NodeKind::Object | NodeKind::Array => {
                copy_into(node.id(), node.kind(), copies, |copies| match node.snapshot() {
                    NodeData::Object(props) => NodeData::Object(
                        props
                            .into_iter()
                            .map(|(k, v)| (k, clone_in(&v, copies)))
                            .collect(),
                    ),
                    NodeData::Array(items) => {
                        NodeData::Array(items.iter().map(|v| clone_in(v, copies)).collect())
                    }
                    other => other,
                })
            }
            NodeKind::Set | NodeKind::Map => value.clone(),
        },
        other => other.clone(),
    }
}

fn copy_into(
    source: NodeId,
    kind: NodeKind,
    copies: &mut Copies,
    fill: impl FnOnce(&mut Copies) -> NodeData,
) -> Value {
    if let Some(copy) = copies.get(&source) {
        return Value::Node(copy.clone());
    }
    let copy = Node::new(kind.empty());
    copies.insert(source, copy.clone());
    let data = fill(copies);
    copy.write(|slot| *slot = data);
    Value::Node(copy)
}
