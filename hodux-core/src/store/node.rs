//! Raw Nodes
//!
//! A [`Node`] is a raw, shared, mutable container: a plain object, an
//! array, a set, or a map. Nodes know nothing about tracking; reading or
//! writing a node directly is invisible to reactions. The observable layer
//! wraps nodes to intercept access.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::value::Value;

/// Unique identifier for a raw node.
///
/// Dependency graph entries are keyed by this id rather than by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of container a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Array,
    Set,
    Map,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::Set => "set",
            NodeKind::Map => "map",
        }
    }

    pub(crate) fn empty(&self) -> NodeData {
        match self {
            NodeKind::Object => NodeData::Object(IndexMap::new()),
            NodeKind::Array => NodeData::Array(Vec::new()),
            NodeKind::Set => NodeData::Set(IndexSet::new()),
            NodeKind::Map => NodeData::Map(IndexMap::new()),
        }
    }
}

/// Contents of a node. Nested containers are always stored raw.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// String-keyed properties in insertion order.
    Object(IndexMap<Arc<str>, Value>),
    Array(Vec<Value>),
    /// Members in insertion order.
    Set(IndexSet<Value>),
    /// Entries in insertion order.
    Map(IndexMap<Value, Value>),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Object(_) => NodeKind::Object,
            NodeData::Array(_) => NodeKind::Array,
            NodeData::Set(_) => NodeKind::Set,
            NodeData::Map(_) => NodeKind::Map,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NodeData::Object(props) => props.len(),
            NodeData::Array(items) => items.len(),
            NodeData::Set(members) => members.len(),
            NodeData::Map(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    data: RwLock<NodeData>,
}

/// Shared handle to a raw container.
///
/// Cloning the handle shares the container; use
/// [`try_clone`](crate::utils::try_clone) for a copy.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self(Arc::new(NodeInner {
            id: NodeId::next(),
            kind: data.kind(),
            data: RwLock::new(data),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the contents under the node's lock.
    ///
    /// The closure must not call back into the store.
    pub fn read<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        f(&self.0.data.read())
    }

    /// Clone the contents out of the lock.
    pub fn snapshot(&self) -> NodeData {
        self.0.data.read().clone()
    }

    /// Raw property lookup; `Undefined` when absent or not an object.
    pub fn get(&self, name: &str) -> Value {
        self.read(|data| match data {
            NodeData::Object(props) => props.get(name).cloned(),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut NodeData) -> R) -> R {
        f(&mut self.0.data.write())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node{}({})", self.id(), self.kind().name())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Children may be other nodes; release this lock before descending.
        match self.snapshot() {
            NodeData::Object(props) => {
                let mut map = serializer.serialize_map(Some(props.len()))?;
                for (k, v) in &props {
                    map.serialize_entry(k.as_ref(), v)?;
                }
                map.end()
            }
            NodeData::Array(items) => items.serialize(serializer),
            NodeData::Set(members) => {
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in &members {
                    seq.serialize_element(member)?;
                }
                seq.end()
            }
            NodeData::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for (k, v) in &entries {
                    seq.serialize_element(&(k, v))?;
                }
                seq.end()
            }
        }
    }
}
