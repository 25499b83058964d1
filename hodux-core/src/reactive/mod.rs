//! Reactive Primitives
//!
//! This module implements the tracking and propagation core: reactions,
//! the runtime that links them to store locations, and batching.
//!
//! # Concepts
//!
//! ## Reactions
//!
//! A Reaction is a computation with no arguments that may be rerun from
//! scratch at any time. Every observable read it performs while running is
//! recorded as a dependency.
//!
//! ## Triggers
//!
//! A write that changes a stored value triggers every reaction registered
//! against the written location. Writes that store an identical value
//! trigger nothing.
//!
//! ## Schedulers
//!
//! By default a triggered reaction reruns. A custom [`Scheduler`] can
//! decide otherwise; selector bindings use one to compare the new
//! selection before notifying their consumer.
//!
//! ## Batches
//!
//! [`batch`] defers notifications until the outermost batch closes and
//! delivers each at most once.
//!
//! # Implementation Notes
//!
//! The running reaction lives on a thread-local stack. When an observable
//! is read, we check whether a reaction is running and, if so, register
//! the dependency with the runtime.

mod batch;
mod context;
mod debug;
mod reaction;
mod runtime;
mod subscriber;

pub use batch::{batch, is_batching, pending_count};
pub use context::{untracked, ReactiveContext};
pub use debug::{DebugEvent, Debugger, Operation};
pub use reaction::{Reaction, ReactionOptions};
pub use runtime::Runtime;
pub use subscriber::{Immediate, ReactionId, Scheduler};
