//! Batching Coordinator
//!
//! Inside [`batch`], triggered reactions are queued instead of notified.
//! When the outermost batch closes, each queued reaction is notified once,
//! in the order it was first triggered, after every write of the batch has
//! been applied.
//!
//! Nested batches flatten into the outermost one. The depth counter is
//! restored by a drop guard, so an error or a panic inside the batched
//! closure never leaves the thread batching. Reactions queued before an
//! error are still flushed; a panic discards them instead.

use std::cell::RefCell;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::context::ReactiveContext;
use super::reaction::Reaction;
use super::subscriber::ReactionId;
use crate::error::{Error, Result};

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: IndexMap<ReactionId, Reaction>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// Run `f` as one batch of mutations.
///
/// Returns `f`'s error if it failed, otherwise the first error raised by a
/// reaction during the flush.
///
/// ```rust,ignore
/// batch(|| {
///     store.set("n", 1)?;
///     store.set("n", 2)?;
///     Ok(())
/// })?; // readers of `n` are notified once, seeing 2
/// ```
pub fn batch<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    let scope = BatchScope::enter();
    let outcome = f();
    let flushed = scope.exit();
    let value = outcome?;
    flushed.map(|()| value)
}

/// Whether the current thread is inside a batch.
pub fn is_batching() -> bool {
    BATCH.with(|state| state.borrow().depth > 0)
}

/// Number of reactions waiting for the current batch to close.
pub fn pending_count() -> usize {
    BATCH.with(|state| state.borrow().pending.len())
}

/// Notify `reaction` now, or queue it if a batch is open.
///
/// A reaction triggered by its own write while it runs is neither run nor
/// queued.
pub(crate) fn schedule(reaction: &Reaction) -> Result<()> {
    if ReactiveContext::is_running(reaction.id()) {
        return Ok(());
    }
    let deferred = BATCH.with(|state| {
        let mut state = state.borrow_mut();
        if state.depth == 0 {
            return false;
        }
        state
            .pending
            .entry(reaction.id())
            .or_insert_with(|| reaction.clone());
        true
    });

    if deferred {
        Ok(())
    } else {
        reaction.schedule()
    }
}

struct BatchScope {
    closed: bool,
}

impl BatchScope {
    fn enter() -> Self {
        BATCH.with(|state| state.borrow_mut().depth += 1);
        Self { closed: false }
    }

    fn exit(mut self) -> Result<()> {
        self.closed = true;
        leave()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if std::thread::panicking() {
            // No reaction runs while unwinding.
            discard();
            return;
        }
        if let Err(err) = leave() {
            warn!(error = %err, "reaction failed while flushing an aborted batch");
        }
    }
}

fn leave() -> Result<()> {
    let outermost = BATCH.with(|state| {
        let mut state = state.borrow_mut();
        state.depth = state.depth.saturating_sub(1);
        state.depth == 0
    });
    if outermost {
        flush()
    } else {
        Ok(())
    }
}

fn discard() {
    BATCH.with(|state| {
        let mut state = state.borrow_mut();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            let dropped = state.pending.len();
            state.pending.clear();
            if dropped > 0 {
                warn!(dropped, "batch panicked, discarding queued reactions");
            }
        }
    });
}

/// Drain the pending queue.
///
/// The depth stays at one while draining so that reactions triggered by a
/// flushed reaction join the queue instead of running nested.
fn flush() -> Result<()> {
    let queued = BATCH.with(|state| {
        let mut state = state.borrow_mut();
        state.depth += 1;
        state.pending.len()
    });
    let _guard = FlushGuard;
    if queued > 0 {
        debug!(queued, "flushing batch");
    }

    let mut first_error: Option<Error> = None;
    while let Some(reaction) = next_pending() {
        if let Err(err) = reaction.schedule() {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn next_pending() -> Option<Reaction> {
    BATCH.with(|state| {
        state
            .borrow_mut()
            .pending
            .shift_remove_index(0)
            .map(|(_, reaction)| reaction)
    })
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        BATCH.with(|state| {
            let mut state = state.borrow_mut();
            state.depth = state.depth.saturating_sub(1);
            // Only reachable with leftovers when a reaction panicked mid-flush.
            state.pending.clear();
        });
    }
}
