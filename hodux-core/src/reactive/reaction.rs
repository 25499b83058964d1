//! Reaction Implementation
//!
//! A Reaction is a re-executable computation whose store reads are
//! tracked.
//!
//! # How Reactions Work
//!
//! 1. When created (unless lazy), the reaction runs its body immediately to
//!    establish initial dependencies.
//!
//! 2. Every run first drops the dependencies recorded by the previous run,
//!    then records each key the body reads. Dependencies are per run, not
//!    cumulative.
//!
//! 3. When a dependency is written, the reaction's scheduler is invoked,
//!    or, without a scheduler, the body reruns.
//!
//! # Lifecycle
//!
//! A reaction is shared by cloning its handle. Disposing it (or dropping
//! the last handle) removes all of its graph edges immediately; later
//! writes to keys it used to read no longer reach it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{trace, warn};

use super::context::ReactiveContext;
use super::debug::{DebugEvent, Debugger};
use super::runtime::Runtime;
use super::subscriber::{ReactionId, Scheduler};
use crate::error::Result;
use crate::graph::Dependency;

type Body = dyn Fn() -> Result<()> + Send + Sync;

/// Construction options for a [`Reaction`].
#[derive(Clone, Default)]
pub struct ReactionOptions {
    scheduler: Option<Arc<dyn Scheduler>>,
    debugger: Option<Debugger>,
    lazy: bool,
}

impl ReactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace "rerun the body" with a custom notification strategy.
    pub fn scheduler<S: Scheduler + 'static>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Attach a debugger sink.
    pub fn debugger(mut self, debugger: Debugger) -> Self {
        self.debugger = Some(debugger);
        self
    }

    pub(crate) fn maybe_debugger(mut self, debugger: Option<Debugger>) -> Self {
        self.debugger = debugger;
        self
    }

    /// Do not run the body at construction.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

pub(crate) struct ReactionInner {
    id: ReactionId,
    body: Box<Body>,
    scheduler: Option<Arc<dyn Scheduler>>,
    debugger: Option<Debugger>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl Drop for ReactionInner {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// A tracked, re-executable computation.
///
/// # Example
///
/// ```rust,ignore
/// let store = create_store(json!({ "n": 0 }))?;
///
/// let s = store.clone();
/// let reaction = Reaction::new(move || {
///     println!("n is {:?}", s.get("n"));
///     Ok(())
/// })?;
///
/// store.set("n", 5)?; // prints: n is 5
/// ```
#[derive(Clone)]
pub struct Reaction(pub(crate) Arc<ReactionInner>);

impl Reaction {
    /// Create a reaction and run it once to establish dependencies.
    pub fn new<F>(body: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::with_options(body, ReactionOptions::default())
    }

    /// Create a reaction with a scheduler, debugger, or lazy start.
    ///
    /// Unless lazy, the first run happens here and its error is returned.
    pub fn with_options<F>(body: F, options: ReactionOptions) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let reaction = Self(Arc::new(ReactionInner {
            id: ReactionId::new(),
            body: Box::new(body),
            scheduler: options.scheduler,
            debugger: options.debugger,
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        }));
        Runtime::register(&reaction);

        if !options.lazy {
            reaction.run()?;
        }
        Ok(reaction)
    }

    /// Get the reaction's unique ID.
    pub fn id(&self) -> ReactionId {
        self.0.id
    }

    /// Run the body under tracking.
    ///
    /// A disposed reaction does nothing. A reaction already on the running
    /// stack is not re-entered: a body that writes a key it also reads does
    /// not recurse into itself.
    pub fn run(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        if ReactiveContext::is_running(self.id()) {
            trace!(reaction = %self.id(), "skipping re-entrant run");
            return Ok(());
        }

        Runtime::clear_dependencies(self.id());

        let _ctx = ReactiveContext::enter(self);
        self.0.run_count.fetch_add(1, Ordering::SeqCst);
        (self.0.body)()
    }

    /// Deliver a change notification: the custom scheduler if any,
    /// otherwise a rerun.
    pub fn schedule(&self) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        match &self.0.scheduler {
            Some(scheduler) => scheduler.schedule(self),
            None => self.run(),
        }
    }

    /// Stop the reaction and remove all of its graph edges.
    pub fn dispose(&self) {
        Runtime::dispose(self);
    }

    pub(crate) fn mark_disposed(&self) -> bool {
        !self.0.disposed.swap(true, Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::SeqCst)
    }

    pub fn has_scheduler(&self) -> bool {
        self.0.scheduler.is_some()
    }

    /// Number of times the body has started.
    pub fn run_count(&self) -> usize {
        self.0.run_count.load(Ordering::SeqCst)
    }

    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.id())
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        Runtime::dependencies(self.id())
    }

    pub fn ptr_eq(&self, other: &Reaction) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Hand `event` to the debugger sink, if one is attached.
    pub(crate) fn debug(&self, event: &DebugEvent) {
        let Some(sink) = &self.0.debugger else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| sink(event))).is_err() {
            warn!(reaction = %self.id(), op = %event.op, "debugger sink panicked; event dropped");
        }
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
