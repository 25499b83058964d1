//! Plain-Data Values
//!
//! A [`Value`] is the dynamic data model the store operates on: primitives,
//! shared mutable containers ([`Node`]), their observable wrappers
//! ([`Observable`]), and opaque foreign references ([`Opaque`]).
//!
//! # Identity
//!
//! `PartialEq`/`Eq`/`Hash` on `Value` implement identity equality, the
//! default equality gate of a selector binding:
//!
//! - numbers compare like `Object.is` (NaN equals NaN, +0 and -0 differ)
//! - strings compare by content
//! - containers and opaque values compare by pointer
//!
//! Structural comparisons live in [`crate::utils`].

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};

use crate::store::{Node, NodeData, NodeKind, Observable};

/// A dynamically typed plain-data value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value (missing key, out-of-range index).
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    /// A raw container. Writes to it are not observed.
    Node(Node),
    /// The observable wrapper of a container.
    Observable(Observable),
    /// A foreign reference (class instance, date, callback...).
    Opaque(Opaque),
}

impl Value {
    /// Build a fresh plain object from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<Arc<str>>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let props: IndexMap<Arc<str>, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into().into_raw()))
            .collect();
        Value::Node(Node::new(NodeData::Object(props)))
    }

    /// Build a fresh array.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let items = items.into_iter().map(|v| v.into().into_raw()).collect();
        Value::Node(Node::new(NodeData::Array(items)))
    }

    /// Build a fresh set. Duplicate members collapse.
    pub fn set<V, I>(members: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let members: IndexSet<Value> = members.into_iter().map(|v| v.into().into_raw()).collect();
        Value::Node(Node::new(NodeData::Set(members)))
    }

    /// Build a fresh map.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries: IndexMap<Value, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.into().into_raw(), v.into().into_raw()))
            .collect();
        Value::Node(Node::new(NodeData::Map(entries)))
    }

    /// Short name of the value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Node(node) => node.kind().name(),
            Value::Observable(obs) => obs.kind().name(),
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_observable(&self) -> Option<&Observable> {
        match self {
            Value::Observable(obs) => Some(obs),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&Opaque> {
        match self {
            Value::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }

    /// The raw container behind this value, whether it is wrapped or not.
    pub fn node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            Value::Observable(obs) => Some(obs.node()),
            _ => None,
        }
    }

    /// Container kind, if this value is a container.
    pub fn kind(&self) -> Option<NodeKind> {
        self.node().map(Node::kind)
    }

    /// Strip an observable wrapper, leaving the raw node. Containers are
    /// always stored raw.
    pub fn into_raw(self) -> Value {
        match self {
            Value::Observable(obs) => Value::Node(obs.node().clone()),
            other => other,
        }
    }
}

fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_value(*a, *b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a.ptr_eq(b),
            (Value::Observable(a), Value::Observable(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                let bits = if n.is_nan() { f64::NAN.to_bits() } else { n.to_bits() };
                bits.hash(state);
            }
            Value::String(s) => s.hash(state),
            Value::Node(node) => node.id().hash(state),
            Value::Observable(obs) => obs.id().hash(state),
            Value::Opaque(opaque) => opaque.addr().hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Node(node) => write!(f, "{node:?}"),
            Value::Observable(obs) => write!(f, "{obs:?}"),
            Value::Opaque(opaque) => write!(f, "{opaque:?}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null | Value::Opaque(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                // Integral numbers render without a trailing `.0`.
                if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Node(node) => node.serialize(serializer),
            Value::Observable(obs) => obs.node().serialize(serializer),
        }
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Observable> for Value {
    fn from(obs: Observable) -> Self {
        Value::Observable(obs)
    }
}

impl From<Opaque> for Value {
    fn from(opaque: Opaque) -> Self {
        Value::Opaque(opaque)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(props) => {
                Value::object(props.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

/// A foreign reference stored by identity.
///
/// Opaque values are never wrapped and never cloned: a snapshot holding
/// one shares it with the store.
#[derive(Clone)]
pub struct Opaque {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.type_name)
    }
}
