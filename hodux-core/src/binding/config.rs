//! Binding configuration.
//!
//! A [`Config`] carries the two knobs of a selector binding: the equality
//! gate and the debugger sink. Configuration comes from three places, in
//! decreasing precedence, field by field:
//!
//! 1. the `Config` passed to the binding itself
//! 2. the innermost [`ConfigScope`] active on the current thread
//! 3. the defaults ([`ref_equal`], no debugger)

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::reactive::{DebugEvent, Debugger};
use crate::utils::ref_equal;
use crate::value::{Opaque, Value};

/// Equality gate between the previous snapshot and a fresh selection.
pub type EqualsFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Per-binding or ambient configuration.
#[derive(Clone, Default)]
pub struct Config {
    equals: Option<EqualsFn>,
    debugger: Option<Debugger>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the equality gate.
    pub fn equals<F>(mut self, equals: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.equals = Some(Arc::new(equals));
        self
    }

    /// Set the debugger sink.
    pub fn debugger<F>(mut self, debugger: F) -> Self
    where
        F: Fn(&DebugEvent) + Send + Sync + 'static,
    {
        self.debugger = Some(Arc::new(debugger));
        self
    }

    /// Build a config from dynamically supplied values.
    ///
    /// `Undefined` and `Null` mean "not set". Anything else must be a
    /// callable created with [`callable_equals`](Self::callable_equals) or
    /// [`callable_debugger`](Self::callable_debugger).
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when a field holds something that is not callable.
    pub fn from_parts(equals: Option<Value>, debugger: Option<Value>) -> Result<Self> {
        Ok(Self {
            equals: callable::<EqualsFn>("equals", equals)?,
            debugger: callable::<Debugger>("debugger", debugger)?,
        })
    }

    /// Package an equality function as a dynamic value.
    pub fn callable_equals<F>(equals: F) -> Value
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        let equals: EqualsFn = Arc::new(equals);
        Value::Opaque(Opaque::new(equals))
    }

    /// Package a debugger sink as a dynamic value.
    pub fn callable_debugger<F>(debugger: F) -> Value
    where
        F: Fn(&DebugEvent) + Send + Sync + 'static,
    {
        let debugger: Debugger = Arc::new(debugger);
        Value::Opaque(Opaque::new(debugger))
    }

    pub fn has_equals(&self) -> bool {
        self.equals.is_some()
    }

    pub fn has_debugger(&self) -> bool {
        self.debugger.is_some()
    }

    /// Fill every unset field of `self` from `fallback`.
    pub fn merged_with(&self, fallback: &Config) -> Config {
        Config {
            equals: self.equals.clone().or_else(|| fallback.equals.clone()),
            debugger: self.debugger.clone().or_else(|| fallback.debugger.clone()),
        }
    }

    /// Merge with the ambient scope and apply defaults.
    pub(crate) fn resolve(&self) -> (EqualsFn, Option<Debugger>) {
        let effective = self.merged_with(&ConfigScope::current());
        let equals = effective
            .equals
            .unwrap_or_else(|| Arc::new(ref_equal) as EqualsFn);
        (equals, effective.debugger)
    }
}

fn callable<T>(field: &'static str, value: Option<Value>) -> Result<Option<T>>
where
    T: Clone + 'static,
{
    match value {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(None),
        Some(Value::Opaque(opaque)) => match opaque.downcast_ref::<T>() {
            Some(f) => Ok(Some(f.clone())),
            None => Err(Error::Config {
                field,
                reason: format!("expected a callable, found {}", opaque.type_name()),
            }),
        },
        Some(other) => Err(Error::Config {
            field,
            reason: format!("expected a callable, found {}", other.type_name()),
        }),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("equals", &self.equals.as_ref().map(|_| "<fn>"))
            .field("debugger", &self.debugger.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Ambient scope
// ----------------------------------------------------------------------------

thread_local! {
    static SCOPES: RefCell<Vec<Config>> = const { RefCell::new(Vec::new()) };
}

/// Provider-style ambient configuration.
///
/// Bindings created while `f` runs inherit `config` for the fields they do
/// not set themselves. Scopes nest; the innermost one wins.
///
/// ```rust,ignore
/// ConfigScope::provide(Config::new().equals(deep_equal), || {
///     consumer.render(|hooks| hooks.use_selector(|| Ok(store.get("todos"))))
/// })?;
/// ```
pub struct ConfigScope {
    _private: (),
}

impl ConfigScope {
    pub fn provide<R>(config: Config, f: impl FnOnce() -> R) -> R {
        SCOPES.with(|scopes| scopes.borrow_mut().push(config));
        let _guard = ConfigScope { _private: () };
        f()
    }

    /// The innermost ambient config, or an empty one.
    pub fn current() -> Config {
        SCOPES.with(|scopes| scopes.borrow().last().cloned().unwrap_or_default())
    }

    /// Number of nested scopes on this thread.
    pub fn depth() -> usize {
        SCOPES.with(|scopes| scopes.borrow().len())
    }
}

impl Drop for ConfigScope {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}
