//! Reaction identity and notification strategy.
//!
//! Every reaction gets a [`ReactionId`] used as its handle in the
//! dependency graph. What happens when its dependencies change is decided
//! by a [`Scheduler`]: either the body simply reruns ([`Immediate`]) or a
//! custom strategy takes over (the selector binding compares the fresh
//! selection against a snapshot before signalling its consumer).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::reaction::Reaction;
use crate::error::Result;

/// Unique identifier for a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactionId(u64);

impl ReactionId {
    /// Generate a new unique reaction ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ReactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Decides what a change notification does to a reaction.
pub trait Scheduler: Send + Sync {
    /// Called once per logical trigger (or once per batch) with the
    /// reaction whose dependencies changed.
    fn schedule(&self, reaction: &Reaction) -> Result<()>;
}

/// Rerun the reaction body right away.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn schedule(&self, reaction: &Reaction) -> Result<()> {
        reaction.run()
    }
}

impl<F> Scheduler for F
where
    F: Fn(&Reaction) -> Result<()> + Send + Sync,
{
    fn schedule(&self, reaction: &Reaction) -> Result<()> {
        self(reaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use crate::reactive::ReactionOptions;

    #[test]
    fn reaction_ids_are_unique() {
        let id1 = ReactionId::new();
        let id2 = ReactionId::new();
        let id3 = ReactionId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn closures_are_schedulers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let scheduler = move |_: &Reaction| -> Result<()> {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let reaction = Reaction::with_options(|| Ok(()), ReactionOptions::new().lazy()).unwrap();
        scheduler.schedule(&reaction).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reaction.run_count(), 0);
    }

    #[test]
    fn immediate_reruns_the_body() {
        let reaction = Reaction::with_options(|| Ok(()), ReactionOptions::new().lazy()).unwrap();
        Immediate.schedule(&reaction).unwrap();
        Immediate.schedule(&reaction).unwrap();
        assert_eq!(reaction.run_count(), 2);
    }
}
