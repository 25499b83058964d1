//! Selector Binding
//!
//! A SelectorBinding subscribes a consumer to the result of a selector
//! function and asks it to refresh only when that result changes.
//!
//! # How Bindings Work
//!
//! 1. Binding creates a reaction whose body runs the selector and stores a
//!    snapshot ([`try_clone`]) of the result in the cache.
//!
//! 2. When something the selector read is written, the reaction's
//!    scheduler reruns the body (so dependencies are re-tracked, including
//!    branches newly taken) and compares the previous snapshot against the
//!    fresh selection with the configured equality gate.
//!
//! 3. Only on inequality is the refresh callback invoked. The cache holds
//!    the fresh snapshot either way.
//!
//! # Why Snapshot?
//!
//! Selections are often live store objects. Comparing a live object with
//! itself after a write would always report equality, so the comparison
//! runs against a copy taken at the previous run.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::config::{Config, EqualsFn};
use crate::error::Result;
use crate::reactive::{Reaction, ReactionOptions, Scheduler};
use crate::utils::try_clone;
use crate::value::Value;

pub(crate) type SelectorFn = Arc<dyn Fn() -> Result<Value> + Send + Sync>;
pub(crate) type RefreshFn = Arc<dyn Fn() + Send + Sync>;

pub(crate) fn boxed_selector<S, V>(selector: S) -> SelectorFn
where
    S: Fn() -> Result<V> + Send + Sync + 'static,
    V: Into<Value>,
{
    Arc::new(move || -> Result<Value> { selector().map(Into::into) })
}

struct BindingState {
    selector: Mutex<SelectorFn>,
    /// Snapshot of the last selection.
    cache: Mutex<Value>,
    /// The last selection as returned by the selector.
    latest: Mutex<Value>,
    equals: EqualsFn,
    refresh: RefreshFn,
    refresh_count: AtomicUsize,
}

impl BindingState {
    fn run_selector(&self) -> Result<()> {
        let selector = self.selector.lock().clone();
        let selected = selector()?;
        let snapshot = try_clone(&selected);
        *self.latest.lock() = selected;
        *self.cache.lock() = snapshot;
        Ok(())
    }
}

/// Rerun, compare against the previous snapshot, then signal.
struct CompareThenSignal {
    state: Arc<BindingState>,
}

impl Scheduler for CompareThenSignal {
    fn schedule(&self, reaction: &Reaction) -> Result<()> {
        let previous = self.state.cache.lock().clone();
        let runs = reaction.run_count();
        reaction.run()?;
        if reaction.run_count() == runs {
            return Ok(());
        }

        let fresh = self.state.latest.lock().clone();
        if (self.state.equals)(&previous, &fresh) {
            debug!(reaction = %reaction.id(), "selection unchanged, refresh suppressed");
            return Ok(());
        }

        let refreshes = self.state.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(reaction = %reaction.id(), refreshes, "selection changed, refreshing");
        (self.state.refresh)();
        Ok(())
    }
}

/// A selector subscribed for one consumer.
///
/// # Example
///
/// ```rust,ignore
/// let store = create_store(json!({ "n": 0 }))?;
///
/// let s = store.clone();
/// let binding = SelectorBinding::bind(
///     move || Ok(s.get("n")),
///     || println!("refresh"),
///     &Config::default(),
/// )?;
///
/// store.set("n", 1)?;          // prints: refresh
/// assert_eq!(binding.value(), Value::from(1));
/// ```
pub struct SelectorBinding {
    state: Arc<BindingState>,
    reaction: Reaction,
}

impl SelectorBinding {
    /// Run `selector` under tracking and subscribe `refresh` to changes of
    /// its result.
    ///
    /// `config` is merged with the ambient scope once, here.
    ///
    /// # Errors
    ///
    /// The selector's error on its first run.
    pub fn bind<S, V, R>(selector: S, refresh: R, config: &Config) -> Result<Self>
    where
        S: Fn() -> Result<V> + Send + Sync + 'static,
        V: Into<Value>,
        R: Fn() + Send + Sync + 'static,
    {
        Self::bind_boxed(boxed_selector(selector), Arc::new(refresh), config)
    }

    pub(crate) fn bind_boxed(
        selector: SelectorFn,
        refresh: RefreshFn,
        config: &Config,
    ) -> Result<Self> {
        let (equals, debugger) = config.resolve();
        let state = Arc::new(BindingState {
            selector: Mutex::new(selector),
            cache: Mutex::new(Value::Undefined),
            latest: Mutex::new(Value::Undefined),
            equals,
            refresh,
            refresh_count: AtomicUsize::new(0),
        });

        let body_state = state.clone();
        let options = ReactionOptions::new()
            .scheduler(CompareThenSignal {
                state: state.clone(),
            })
            .maybe_debugger(debugger);
        let reaction = Reaction::with_options(move || body_state.run_selector(), options)?;

        debug!(reaction = %reaction.id(), dependencies = reaction.dependency_count(), "selector bound");
        Ok(Self { state, reaction })
    }

    /// The cached snapshot of the last selection. Runs nothing.
    pub fn value(&self) -> Value {
        self.state.cache.lock().clone()
    }

    /// Rerun the existing reaction (the render path) and return the fresh
    /// snapshot.
    pub fn select(&self) -> Result<Value> {
        self.reaction.run()?;
        Ok(self.value())
    }

    /// Replace the selector used by later runs.
    pub fn set_selector<S, V>(&self, selector: S)
    where
        S: Fn() -> Result<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.set_selector_boxed(boxed_selector(selector));
    }

    pub(crate) fn set_selector_boxed(&self, selector: SelectorFn) {
        *self.state.selector.lock() = selector;
    }

    /// Number of refresh signals sent so far.
    pub fn refresh_count(&self) -> usize {
        self.state.refresh_count.load(Ordering::SeqCst)
    }

    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }

    pub fn is_bound(&self) -> bool {
        !self.reaction.is_disposed()
    }

    /// Dispose the underlying reaction. Later writes no longer reach it.
    pub fn unbind(&self) {
        if self.is_bound() {
            self.reaction.dispose();
            debug!(reaction = %self.reaction.id(), "selector unbound");
        }
    }
}

impl Drop for SelectorBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for SelectorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorBinding")
            .field("reaction", &self.reaction.id())
            .field("value", &self.value())
            .field("refresh_count", &self.refresh_count())
            .field("bound", &self.is_bound())
            .finish()
    }
}
