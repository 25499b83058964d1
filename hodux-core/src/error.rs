//! Error types shared by every layer of the store.
//!
//! All precondition failures are raised synchronously at the call that
//! violates them. Failures inside a reaction body travel back to whatever
//! caused the run (a write, a batch, or an initial bind) as
//! [`Error::Reaction`] or as the body's own error.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the reactive store.
#[derive(Debug, Error)]
pub enum Error {
    /// A store root must be a plain key/value object.
    #[error("invalid model: expected a plain object, found {found}")]
    InvalidModel { found: &'static str },

    /// A configuration value has the wrong shape (e.g. `equals` is not callable).
    #[error("invalid config for `{field}`: {reason}")]
    Config { field: &'static str, reason: String },

    /// An operation that needs an observable store was handed a raw value.
    #[error("not an observable store: found {found}")]
    NotObservable { found: &'static str },

    /// A write was attempted on a container kind that does not support it.
    #[error("`{op}` is not supported on {kind}")]
    Unsupported { op: &'static str, kind: &'static str },

    /// A reaction body failed.
    #[error("reaction failed: {0}")]
    Reaction(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an arbitrary failure raised from inside a reaction body.
    pub fn reaction<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Reaction(err.into())
    }

    pub(crate) fn unsupported(op: &'static str, kind: &'static str) -> Self {
        Self::Unsupported { op, kind }
    }
}
