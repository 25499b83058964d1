//! Hodux Core
//!
//! This crate provides a fine-grained reactive store for UI state.
//! It implements:
//!
//! - Observable stores over plain data (objects, arrays, sets, maps)
//! - Per-key dependency tracking and change propagation
//! - Batching of mutations into a single notification pass
//! - Selector bindings that refresh a consumer only when its selection changes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the dynamic plain-data model
//! - `store`: raw containers and their observable views
//! - `graph`: the `(container, key) <-> reaction` dependency graph
//! - `reactive`: reactions, tracking context, runtime, batching
//! - `binding`: selector bindings, consumer hooks, `connect`
//! - `utils`: equality functions and snapshot cloning
//!
//! # Example
//!
//! ```rust,ignore
//! use hodux_core::{batch, create_store, Config, SelectorBinding};
//! use serde_json::json;
//!
//! let store = create_store(json!({ "n": 0 }))?;
//!
//! let s = store.clone();
//! let binding = SelectorBinding::bind(
//!     move || Ok(s.get("n")),
//!     || println!("re-render"),
//!     &Config::default(),
//! )?;
//!
//! batch(|| {
//!     store.set("n", 1)?;
//!     store.set("n", 2)?;
//!     Ok(())
//! })?;
//! // prints "re-render" once; binding.value() is 2
//! ```

pub mod binding;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod store;
pub mod utils;
pub mod value;

pub use binding::{
    connect, Component, Config, ConfigScope, Connected, Connector, Consumer, EqualsFn, Hooks,
    SelectorBinding,
};
pub use error::{Error, Result};
pub use reactive::{
    batch, is_batching, pending_count, untracked, DebugEvent, Debugger, Operation, Reaction,
    ReactionOptions,
};
pub use store::{create_store, is_observable, unwrap, Node, NodeKind, Observable, Store};
pub use utils::{deep_equal, ref_equal, shallow_equal, try_clone};
pub use value::{Opaque, Value};
