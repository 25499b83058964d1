//! Dependency Keys
//!
//! A dependency is a `(target node, key)` pair. The key names what was
//! read: a property, an element, a collection entry, or the structure of
//! the container as a whole.

use std::fmt;
use std::sync::Arc;

use crate::store::NodeId;
use crate::value::Value;

/// What part of a container a reaction read.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named property of a plain object.
    Prop(Arc<str>),
    /// An element of an array.
    Index(usize),
    /// A set member or a map key.
    Entry(Value),
    /// Size, length, and key listing. Triggered by structural changes
    /// (add, delete, clear) which leave every existing key untouched.
    Iterate,
}

impl Key {
    pub fn prop(name: &str) -> Self {
        Key::Prop(name.into())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Prop(name) => write!(f, ".{name}"),
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Entry(value) => write!(f, "<{value:?}>"),
            Key::Iterate => f.write_str("@iterate"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One edge endpoint as recorded on the reaction side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub target: NodeId,
    pub key: Key,
}
