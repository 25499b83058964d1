//! Observable Implementation
//!
//! An Observable is the intercepting view of a raw [`Node`]. Every read
//! through it registers the running reaction (if any) against the key it
//! read; every write that changes the stored value triggers the reactions
//! registered against the written key.
//!
//! # How Observables Work
//!
//! 1. Reads outside a running reaction are plain pass-through reads.
//!
//! 2. Containers read through an observable come back as their own unique
//!    observable, created on first access. Nested data is wrapped lazily,
//!    one level per read.
//!
//! 3. Writes store raw values (an observable argument is unwrapped first),
//!    compare against the previous value, and trigger only on change. A
//!    write on the wrong container kind fails with
//!    [`Error::Unsupported`]; a read on the wrong kind yields `Undefined`
//!    or an empty result.
//!
//! # Keys
//!
//! | Read | Key |
//! |---|---|
//! | `get`, `has` | `Prop(name)` |
//! | `at` | `Index(i)` |
//! | `contains`, `map_get` | `Entry(key)` |
//! | `len`, `keys`, `values`, `entries` | `Iterate` (plus each visited key) |

use std::fmt;
use std::sync::Arc;

use super::node::{Node, NodeData, NodeId, NodeKind};
use super::registry;
use crate::error::{Error, Result};
use crate::graph::Key;
use crate::reactive::{DebugEvent, Operation, ReactiveContext, Runtime};
use crate::value::Value;

pub(crate) struct ObservableInner {
    node: Node,
}

impl ObservableInner {
    pub(crate) fn new(node: Node) -> Self {
        Self { node }
    }
}

impl Drop for ObservableInner {
    fn drop(&mut self) {
        registry::release(self.node.id());
    }
}

/// The unique observable view of a raw container.
///
/// # Example
///
/// ```rust,ignore
/// let store = create_store(json!({ "n": 0, "todos": [] }))?;
///
/// store.set("n", 1)?;
/// let todos = store.get("todos");          // an Observable
/// todos.as_observable().unwrap().push("write docs")?;
/// ```
#[derive(Clone)]
pub struct Observable(pub(crate) Arc<ObservableInner>);

fn expose(value: Value) -> Value {
    match value {
        Value::Node(node) => Value::Observable(registry::wrap(&node)),
        other => other,
    }
}

enum Write {
    Added(Value),
    Replaced { value: Value, old: Value },
}

impl Observable {
    /// The underlying raw node.
    pub fn node(&self) -> &Node {
        &self.0.node
    }

    pub fn id(&self) -> NodeId {
        self.0.node.id()
    }

    pub fn kind(&self) -> NodeKind {
        self.0.node.kind()
    }

    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn track(&self, op: Operation, key: impl FnOnce() -> Key) {
        if ReactiveContext::is_active() {
            Runtime::track(self.node(), key(), op);
        }
    }

    fn unsupported(&self, op: &'static str) -> Error {
        Error::unsupported(op, self.kind().name())
    }

    fn commit(&self, key: Key, write: Option<Write>) -> Result<()> {
        match write {
            None => Ok(()),
            Some(Write::Added(value)) => Runtime::trigger(DebugEvent::add(self.node(), key, value)),
            Some(Write::Replaced { value, old }) if value == old => Ok(()),
            Some(Write::Replaced { value, old }) => {
                Runtime::trigger(DebugEvent::set(self.node(), key, value, old))
            }
        }
    }

    // ------------------------------------------------------------------
    // Plain objects
    // ------------------------------------------------------------------

    /// Read a property.
    pub fn get(&self, name: &str) -> Value {
        if self.kind() != NodeKind::Object {
            return Value::Undefined;
        }
        self.track(Operation::Get, || Key::prop(name));
        expose(self.node().get(name))
    }

    /// Whether a property is present.
    pub fn has(&self, name: &str) -> bool {
        let found = self.node().read(|data| match data {
            NodeData::Object(props) => Some(props.contains_key(name)),
            _ => None,
        });
        match found {
            Some(found) => {
                self.track(Operation::Has, || Key::prop(name));
                found
            }
            None => false,
        }
    }

    /// Write a property. Adding a new property also changes iteration.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into().into_raw();
        let previous = self
            .node()
            .write(|data| match data {
                NodeData::Object(props) => Ok(props.insert(Arc::from(name), value.clone())),
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("set"))?;

        let write = match previous {
            None => Write::Added(value),
            Some(old) => Write::Replaced { value, old },
        };
        self.commit(Key::prop(name), Some(write))
    }

    /// Read-modify-write a property. The read is not tracked.
    pub fn update(&self, name: &str, f: impl FnOnce(&Value) -> Value) -> Result<()> {
        let next = f(&self.node().get(name));
        self.set(name, next)
    }

    /// Remove a property. Returns whether it was present.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let removed = self
            .node()
            .write(|data| match data {
                NodeData::Object(props) => Ok(props.shift_remove(name)),
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("delete"))?;

        match removed {
            Some(old) => {
                Runtime::trigger(DebugEvent::delete(self.node(), Key::prop(name), old))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Read an element; `Undefined` past the end.
    pub fn at(&self, index: usize) -> Value {
        let item = self.node().read(|data| match data {
            NodeData::Array(items) => Some(items.get(index).cloned().unwrap_or_default()),
            _ => None,
        });
        match item {
            Some(item) => {
                self.track(Operation::Get, || Key::Index(index));
                expose(item)
            }
            None => Value::Undefined,
        }
    }

    /// Write an element. Writing past the end pads with `Undefined`.
    pub fn set_at(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into().into_raw();
        let write = self
            .node()
            .write(|data| match data {
                NodeData::Array(items) if index < items.len() => {
                    let old = std::mem::replace(&mut items[index], value.clone());
                    Ok(Write::Replaced { value, old })
                }
                NodeData::Array(items) => {
                    items.resize(index, Value::Undefined);
                    items.push(value.clone());
                    Ok(Write::Added(value))
                }
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("set_at"))?;

        self.commit(Key::Index(index), Some(write))
    }

    /// Append an element. Returns the new length.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        let value = value.into().into_raw();
        let index = self
            .node()
            .write(|data| match data {
                NodeData::Array(items) => {
                    items.push(value.clone());
                    Ok(items.len() - 1)
                }
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("push"))?;

        self.commit(Key::Index(index), Some(Write::Added(value)))?;
        Ok(index + 1)
    }

    /// Remove the last element; `Undefined` when empty.
    pub fn pop(&self) -> Result<Value> {
        let popped = self
            .node()
            .write(|data| match data {
                NodeData::Array(items) => Ok(items.pop().map(|old| (items.len(), old))),
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("pop"))?;

        match popped {
            Some((index, old)) => {
                Runtime::trigger(DebugEvent::delete(self.node(), Key::Index(index), old.clone()))?;
                Ok(expose(old))
            }
            None => Ok(Value::Undefined),
        }
    }

    // ------------------------------------------------------------------
    // Sets and maps
    // ------------------------------------------------------------------

    /// Add a set member. Returns false (and triggers nothing) if present.
    pub fn add(&self, member: impl Into<Value>) -> Result<bool> {
        let member = member.into().into_raw();
        let inserted = self
            .node()
            .write(|data| match data {
                NodeData::Set(members) => Ok(members.insert(member.clone())),
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("add"))?;

        if inserted {
            self.commit(Key::Entry(member.clone()), Some(Write::Added(member)))?;
        }
        Ok(inserted)
    }

    /// Set membership or map key presence.
    pub fn contains(&self, key: impl Into<Value>) -> bool {
        let key = key.into().into_raw();
        let found = self.node().read(|data| match data {
            NodeData::Set(members) => Some(members.contains(&key)),
            NodeData::Map(entries) => Some(entries.contains_key(&key)),
            _ => None,
        });
        match found {
            Some(found) => {
                self.track(Operation::Has, || Key::Entry(key));
                found
            }
            None => false,
        }
    }

    /// Read a map entry; `Undefined` when absent.
    pub fn map_get(&self, key: impl Into<Value>) -> Value {
        let key = key.into().into_raw();
        let found = self.node().read(|data| match data {
            NodeData::Map(entries) => Some(entries.get(&key).cloned().unwrap_or_default()),
            _ => None,
        });
        match found {
            Some(value) => {
                self.track(Operation::Get, || Key::Entry(key));
                expose(value)
            }
            None => Value::Undefined,
        }
    }

    /// Write a map entry.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = key.into().into_raw();
        let value = value.into().into_raw();
        let previous = self
            .node()
            .write(|data| match data {
                NodeData::Map(entries) => Ok(entries.insert(key.clone(), value.clone())),
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("insert"))?;

        let write = match previous {
            None => Write::Added(value),
            Some(old) => Write::Replaced { value, old },
        };
        self.commit(Key::Entry(key), Some(write))
    }

    /// Remove a set member or map entry. Returns whether it was present.
    pub fn remove(&self, key: impl Into<Value>) -> Result<bool> {
        let key = key.into().into_raw();
        let removed = self
            .node()
            .write(|data| match data {
                NodeData::Set(members) => Ok(members.shift_remove(&key).then(|| key.clone())),
                NodeData::Map(entries) => Ok(entries.shift_remove(&key)),
                _ => Err(()),
            })
            .map_err(|()| self.unsupported("remove"))?;

        match removed {
            Some(old) => {
                Runtime::trigger(DebugEvent::delete(self.node(), Key::Entry(key), old))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Empty an array, set, or map. Every reader of the container is
    /// triggered once.
    pub fn clear(&self) -> Result<()> {
        let previous = self
            .node()
            .write(|data| match data {
                NodeData::Object(_) => Err(()),
                data if data.is_empty() => Ok(None),
                data => {
                    let empty = data.kind().empty();
                    Ok(Some(std::mem::replace(data, empty)))
                }
            })
            .map_err(|()| self.unsupported("clear"))?;

        match previous {
            Some(old) => Runtime::trigger(DebugEvent::clear(self.node(), Node::new(old))),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Iteration (every kind)
    // ------------------------------------------------------------------

    /// Number of properties, elements, members, or entries.
    pub fn len(&self) -> usize {
        self.track(Operation::Iterate, || Key::Iterate);
        self.node().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same as [`len`](Self::len), named after collection `size`.
    pub fn size(&self) -> usize {
        self.len()
    }

    /// Property names of an object or keys of a map.
    pub fn keys(&self) -> Vec<Value> {
        let keys: Vec<Value> = self.node().read(|data| match data {
            NodeData::Object(props) => props.keys().map(|k| Value::String(k.clone())).collect(),
            NodeData::Map(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        });
        if matches!(self.kind(), NodeKind::Object | NodeKind::Map) {
            self.track(Operation::Iterate, || Key::Iterate);
        }
        keys.into_iter().map(expose).collect()
    }

    /// `(key, value)` pairs of an object (string keys) or a map.
    ///
    /// Tracks the structure and every visited key, so replacing any value
    /// reaches the reader.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        let entries: Vec<(Value, Value)> = self.node().read(|data| match data {
            NodeData::Object(props) => props
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                .collect(),
            NodeData::Map(entries) => entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        });

        match self.kind() {
            NodeKind::Object | NodeKind::Map => {
                self.track(Operation::Iterate, || Key::Iterate);
                for (key, _) in &entries {
                    self.track(Operation::Get, || match key {
                        Value::String(name) if self.kind() == NodeKind::Object => {
                            Key::Prop(name.clone())
                        }
                        other => Key::Entry(other.clone()),
                    });
                }
            }
            _ => return Vec::new(),
        }

        entries
            .into_iter()
            .map(|(k, v)| (expose(k), expose(v)))
            .collect()
    }

    /// Values of any container, in order.
    pub fn values(&self) -> Vec<Value> {
        match self.kind() {
            NodeKind::Object | NodeKind::Map => {
                self.entries().into_iter().map(|(_, v)| v).collect()
            }
            NodeKind::Array => {
                let items = self.node().read(|data| match data {
                    NodeData::Array(items) => items.clone(),
                    _ => Vec::new(),
                });
                self.track(Operation::Iterate, || Key::Iterate);
                for index in 0..items.len() {
                    self.track(Operation::Get, || Key::Index(index));
                }
                items.into_iter().map(expose).collect()
            }
            NodeKind::Set => {
                let members: Vec<Value> = self.node().read(|data| match data {
                    NodeData::Set(members) => members.iter().cloned().collect(),
                    _ => Vec::new(),
                });
                self.track(Operation::Iterate, || Key::Iterate);
                members.into_iter().map(expose).collect()
            }
        }
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Observable {}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observable({:?})", self.node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Reaction;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn observe(value: Value) -> Observable {
        registry::wrap(value.node().unwrap())
    }

    fn counting<F>(read: F) -> (Reaction, Arc<AtomicUsize>)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        let reaction = Reaction::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            read();
            Ok(())
        })
        .unwrap();
        (reaction, runs)
    }

    #[test]
    fn object_reads_and_writes() {
        let obs = observe(Value::object([("a", 1)]));
        assert_eq!(obs.get("a"), Value::from(1));
        assert!(obs.has("a"));
        assert!(!obs.has("b"));

        obs.set("b", "x").unwrap();
        assert_eq!(obs.get("b"), Value::from("x"));
        assert_eq!(obs.len(), 2);

        assert!(obs.delete("a").unwrap());
        assert!(!obs.delete("a").unwrap());
        assert_eq!(obs.keys(), vec![Value::from("b")]);
    }

    #[test]
    fn nested_containers_are_wrapped_lazily_and_uniquely() {
        let obs = observe(Value::object([("inner", Value::object([("n", 0)]))]));
        let first = obs.get("inner");
        let second = obs.get("inner");

        assert!(matches!(first, Value::Observable(_)));
        assert_eq!(first, second);
    }

    #[test]
    fn writing_an_observable_stores_the_raw_node() {
        let obs = observe(Value::object([("a", Value::Null)]));
        let child = observe(Value::array([1, 2]));
        obs.set("a", child.clone()).unwrap();

        assert!(matches!(obs.node().get("a"), Value::Node(_)));
        assert_eq!(obs.get("a"), Value::Observable(child));
    }

    #[test]
    fn wrong_kind_writes_fail_and_reads_are_empty() {
        let list = observe(Value::array([1]));
        assert!(matches!(
            list.set("a", 1),
            Err(Error::Unsupported { op: "set", kind: "array" })
        ));
        assert!(list.get("a").is_undefined());

        let obj = observe(Value::object([("a", 1)]));
        assert!(obj.push(1).is_err());
        assert!(obj.clear().is_err());
        assert!(!obj.contains(1));
    }

    #[test]
    fn tracked_property_triggers_only_on_change() {
        let obs = observe(Value::object([("a", 1), ("b", 1)]));
        let reader = obs.clone();
        let (_reaction, runs) = counting(move || {
            reader.get("a");
        });

        obs.set("a", 1).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        obs.set("b", 2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        obs.set("a", 2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn adding_a_property_reaches_key_listings() {
        let obs = observe(Value::object([("a", 1)]));
        let reader = obs.clone();
        let (_reaction, runs) = counting(move || {
            reader.keys();
        });

        obs.set("a", 5).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        obs.set("b", 1).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        obs.delete("b").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn array_iteration_sees_pushes_and_replacements() {
        let list = observe(Value::array([1, 2]));
        let reader = list.clone();
        let (_reaction, runs) = counting(move || {
            reader.values();
        });

        list.push(3).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        list.set_at(0, 10).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        list.set_at(0, 10).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        assert_eq!(list.pop().unwrap(), Value::from(3));
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn set_at_past_the_end_pads() {
        let list = observe(Value::array([1]));
        list.set_at(3, 4).unwrap();
        assert_eq!(list.len(), 4);
        assert!(list.at(2).is_undefined());
        assert_eq!(list.at(3), Value::from(4));
    }

    #[test]
    fn set_size_reacts_to_membership_only() {
        let set = observe(Value::set(Vec::<Value>::new()));
        let reader = set.clone();
        let (_reaction, runs) = counting(move || {
            reader.size();
        });

        assert!(set.add(1).unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        assert!(!set.add(1).unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        assert!(set.remove(1).unwrap());
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn map_entry_reads_are_keyed() {
        let map = observe(Value::map([("a", 1)]));
        let reader = map.clone();
        let (_reaction, runs) = counting(move || {
            reader.map_get("a");
        });

        map.insert("b", 2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        map.insert("a", 1).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        map.insert("a", 3).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(map.contains("a"));
    }

    #[test]
    fn clear_triggers_every_reader_once() {
        let map = observe(Value::map([("a", 1), ("b", 2)]));
        let reader = map.clone();
        let (_reaction, runs) = counting(move || {
            reader.map_get("a");
            reader.map_get("b");
            reader.size();
        });

        map.clear().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(map.len(), 0);

        map.clear().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
