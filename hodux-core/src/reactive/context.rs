//! Reactive Context
//!
//! The reactive context tracks which reaction is currently running, so a
//! read through an observable knows whom to register as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running a reaction pushes it; the guard
//! pops it when the run ends, including when the body returns an error or
//! panics. This supports nested runs (a reaction whose body triggers or
//! starts another reaction).
//!
//! An untracked frame (`None`) suspends tracking for its extent without
//! losing the enclosing reaction.

use std::cell::RefCell;

use super::reaction::Reaction;
use super::ReactionId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Reaction>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    reaction_id: Option<ReactionId>,
}

impl ReactiveContext {
    /// Enter a tracking context for `reaction`.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(reaction: &Reaction) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Some(reaction.clone())));
        Self {
            reaction_id: Some(reaction.id()),
        }
    }

    /// Enter a frame in which reads are not tracked.
    pub fn suspend() -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        Self { reaction_id: None }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
    }

    /// The reaction reads are currently attributed to, if any.
    pub fn current() -> Option<Reaction> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().flatten())
    }

    pub fn current_id() -> Option<ReactionId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.as_ref().map(Reaction::id))
        })
    }

    /// Whether `id` is anywhere on the running stack.
    pub fn is_running(id: ReactionId) -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .flatten()
                .any(|reaction| reaction.id() == id)
        })
    }

    /// Nesting depth, untracked frames included.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.as_ref().map(Reaction::id),
                self.reaction_id,
                "ReactiveContext mismatch"
            );
        }
    }
}

/// Run `f` without attributing its reads to the running reaction.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::suspend();
    f()
}
