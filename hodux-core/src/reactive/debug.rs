//! Debug events delivered to a reaction's debugger sink.
//!
//! Reads (get/has/iterate) are reported while the reaction tracks them;
//! writes (set/add/delete/clear) are reported once per affected reaction
//! when they trigger it. Sinks observe only: a panicking sink is caught
//! and logged.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::graph::Key;
use crate::store::Node;
use crate::value::Value;

/// Debugger sink attached to a reaction.
pub type Debugger = Arc<dyn Fn(&DebugEvent) + Send + Sync>;

/// Kind of store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    Has,
    Iterate,
    Set,
    Add,
    Delete,
    Clear,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Has => "has",
            Operation::Iterate => "iterate",
            Operation::Set => "set",
            Operation::Add => "add",
            Operation::Delete => "delete",
            Operation::Clear => "clear",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Set | Operation::Add | Operation::Delete | Operation::Clear
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A read or write on a store container.
///
/// `target` is the raw node operated on. `old_target` is only present for
/// `clear` and holds a copy of the container before it was emptied.
#[derive(Debug, Clone)]
pub struct DebugEvent {
    pub op: Operation,
    pub target: Node,
    pub key: Option<Key>,
    pub value: Option<Value>,
    pub old_value: Option<Value>,
    pub old_target: Option<Node>,
}

impl DebugEvent {
    fn new(op: Operation, target: &Node, key: Option<Key>) -> Self {
        Self {
            op,
            target: target.clone(),
            key,
            value: None,
            old_value: None,
            old_target: None,
        }
    }

    /// A tracked read. Iteration reads carry no key.
    pub fn read(op: Operation, target: &Node, key: &Key) -> Self {
        let key = match key {
            Key::Iterate => None,
            other => Some(other.clone()),
        };
        Self::new(op, target, key)
    }

    pub fn set(target: &Node, key: Key, value: Value, old_value: Value) -> Self {
        Self {
            value: Some(value),
            old_value: Some(old_value),
            ..Self::new(Operation::Set, target, Some(key))
        }
    }

    pub fn add(target: &Node, key: Key, value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::new(Operation::Add, target, Some(key))
        }
    }

    pub fn delete(target: &Node, key: Key, old_value: Value) -> Self {
        Self {
            old_value: Some(old_value),
            ..Self::new(Operation::Delete, target, Some(key))
        }
    }

    pub fn clear(target: &Node, old_target: Node) -> Self {
        Self {
            old_target: Some(old_target),
            ..Self::new(Operation::Clear, target, None)
        }
    }
}
