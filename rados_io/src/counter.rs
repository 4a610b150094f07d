//! Active-completion counter.
//!
//! Counts completion handles whose native token was created and not yet
//! released. Incremented and decremented only by the completion handle.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::error;

#[derive(Debug)]
pub(crate) struct CompletionCounter {
    active: AtomicUsize,
}

impl CompletionCounter {
    pub(crate) const fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
        }
    }

    pub(crate) fn get(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn increment(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// Never goes below zero.
    pub(crate) fn decrement(&self) {
        if self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            error!("active completion counter would go negative");
        }
    }
}

static ACTIVE_COMPLETIONS: CompletionCounter = CompletionCounter::new();

/// Number of completion handles created and not yet released, process-wide.
#[must_use]
pub fn active_completions() -> usize {
    ACTIVE_COMPLETIONS.get()
}

pub(crate) fn completion_created() {
    ACTIVE_COMPLETIONS.increment();
}

pub(crate) fn completion_released() {
    ACTIVE_COMPLETIONS.decrement();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_decrement() {
        let counter = CompletionCounter::new();
        counter.increment();
        counter.increment();
        counter.decrement();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_never_negative() {
        let counter = CompletionCounter::new();
        counter.decrement();
        assert_eq!(counter.get(), 0);
        counter.increment();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let counter = Arc::new(CompletionCounter::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                        counter.decrement();
                    }
                    counter.increment();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.get(), 8);
    }
}
