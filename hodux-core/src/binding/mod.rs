//! Selector Bindings
//!
//! The subscription surface a UI host consumes.
//!
//! # Overview
//!
//! - [`SelectorBinding`]: one selector, tracked by a reaction whose
//!   scheduler compares the previous snapshot with the fresh selection and
//!   signals a refresh only on inequality.
//! - [`Consumer`] / [`Hooks::use_selector`]: bindings owned by a component
//!   instance, addressed by call order across render passes.
//! - [`connect`]: wraps a [`Component`] so its props are merged with a
//!   selected key/value map.
//! - [`Config`] / [`ConfigScope`]: equality gate and debugger sink, per
//!   binding or ambient.

mod config;
mod connect;
mod consumer;
mod selector;

pub use config::{Config, ConfigScope, EqualsFn};
pub use connect::{connect, Component, Connected, Connector};
pub use consumer::{Consumer, Hooks};
pub use selector::SelectorBinding;
