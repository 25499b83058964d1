//! Consumer instances and the `use_selector` hook.
//!
//! A [`Consumer`] stands for one mounted UI component. Each render pass
//! calls [`Hooks::use_selector`] in a fixed order; the n-th call of every
//! pass addresses the same [`SelectorBinding`]. The first pass creates the
//! bindings, later passes rerun them with the selector of that pass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::config::Config;
use super::selector::{boxed_selector, RefreshFn, SelectorBinding};
use crate::error::Result;
use crate::value::Value;

/// A component instance holding selector bindings.
///
/// ```rust,ignore
/// let consumer = Consumer::new(move || needs_render.store(true, Ordering::SeqCst));
///
/// let total = consumer.render(|hooks| {
///     let s = store.clone();
///     hooks.use_selector(move || Ok(s.get("n")))
/// })?;
/// ```
pub struct Consumer {
    refresh: RefreshFn,
    slots: Mutex<Vec<Arc<SelectorBinding>>>,
    render_count: AtomicUsize,
}

impl Consumer {
    /// `refresh` is called whenever one of the consumer's selections
    /// changes.
    pub fn new<R>(refresh: R) -> Self
    where
        R: Fn() + Send + Sync + 'static,
    {
        Self {
            refresh: Arc::new(refresh),
            slots: Mutex::new(Vec::new()),
            render_count: AtomicUsize::new(0),
        }
    }

    /// Run one render pass.
    pub fn render<T>(&self, f: impl FnOnce(&mut Hooks<'_>) -> T) -> T {
        self.render_count.fetch_add(1, Ordering::SeqCst);
        let mut hooks = Hooks {
            consumer: self,
            cursor: 0,
        };
        f(&mut hooks)
    }

    /// Dispose every binding. A later render starts from scratch.
    pub fn unmount(&self) {
        let slots = std::mem::take(&mut *self.slots.lock());
        for binding in slots {
            binding.unbind();
        }
    }

    pub fn render_count(&self) -> usize {
        self.render_count.load(Ordering::SeqCst)
    }

    pub fn binding_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// The binding created by the `index`-th `use_selector` call.
    pub fn binding(&self, index: usize) -> Option<Arc<SelectorBinding>> {
        self.slots.lock().get(index).cloned()
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Hook surface available during a render pass.
pub struct Hooks<'a> {
    consumer: &'a Consumer,
    cursor: usize,
}

impl Hooks<'_> {
    /// Select from the store with the ambient configuration.
    pub fn use_selector<S, V>(&mut self, selector: S) -> Result<Value>
    where
        S: Fn() -> Result<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.use_selector_with(selector, &Config::default())
    }

    /// Select from the store with a per-binding configuration.
    ///
    /// The configuration is read on the first render only.
    pub fn use_selector_with<S, V>(&mut self, selector: S, config: &Config) -> Result<Value>
    where
        S: Fn() -> Result<V> + Send + Sync + 'static,
        V: Into<Value>,
    {
        let slot = self.cursor;
        self.cursor += 1;
        let selector = boxed_selector(selector);

        // Clone out of the lock: running the selector may re-enter the
        // consumer through its refresh callback.
        let existing = self.consumer.slots.lock().get(slot).cloned();
        match existing {
            Some(binding) => {
                binding.set_selector_boxed(selector);
                binding.select()
            }
            None => {
                let binding =
                    SelectorBinding::bind_boxed(selector, self.consumer.refresh.clone(), config)?;
                let value = binding.value();
                self.consumer.slots.lock().push(Arc::new(binding));
                Ok(value)
            }
        }
    }
}
