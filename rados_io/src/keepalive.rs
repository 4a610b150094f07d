//! Keep-alive registry: session → cluster associations.
//!
//! An I/O session does not own its cluster, yet the cluster must not be
//! finalized while the session can still be used. Opening a session links
//! it here; the registry entry holds the strong reference to the cluster.
//! The session carries a [`KeepAlive`] guard and nothing else, so the entry
//! lives exactly as long as the session: when the session is finalized the
//! guard drops and the entry, and with it the cluster reference, goes away.
//! There is no public unlink.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::trace;

use crate::cluster::ClusterCore;
use crate::idgen::SessionId;

pub(crate) struct KeepAliveRegistry<T> {
    entries: Mutex<HashMap<SessionId, Arc<T>>>,
}

impl<T> KeepAliveRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Associate `session` with `dependency`. A second link for the same
    /// session keeps the first entry and returns an inert guard.
    pub(crate) fn link(&self, session: SessionId, dependency: Arc<T>) -> KeepAlive<'_, T> {
        let mut entries = self.entries.lock();
        let owns_entry = !entries.contains_key(&session);
        if owns_entry {
            entries.insert(session, dependency);
            trace!(session = %session, "keep-alive linked");
        }
        KeepAlive {
            registry: self,
            session,
            owns_entry,
        }
    }

    fn collect(&self, session: SessionId) {
        let entry = self.entries.lock().remove(&session);
        trace!(session = %session, "keep-alive collected");
        // Dropped outside the lock: this may finalize the dependency.
        drop(entry);
    }

    fn get(&self, session: SessionId) -> Option<Arc<T>> {
        self.entries.lock().get(&session).cloned()
    }

    pub(crate) fn is_linked(&self, session: SessionId) -> bool {
        self.entries.lock().contains_key(&session)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Guard tying a registry entry to the lifetime of its session.
pub(crate) struct KeepAlive<'r, T> {
    registry: &'r KeepAliveRegistry<T>,
    session: SessionId,
    owns_entry: bool,
}

impl<T> KeepAlive<'_, T> {
    /// The dependency this guard keeps alive.
    pub(crate) fn dependency(&self) -> Option<Arc<T>> {
        self.registry.get(self.session)
    }
}

impl<T> Drop for KeepAlive<'_, T> {
    fn drop(&mut self) {
        if self.owns_entry {
            self.registry.collect(self.session);
        }
    }
}

lazy_static! {
    static ref REGISTRY: KeepAliveRegistry<ClusterCore> = KeepAliveRegistry::new();
}

pub(crate) fn link(session: SessionId, cluster: Arc<ClusterCore>) -> KeepAlive<'static, ClusterCore> {
    REGISTRY.link(session, cluster)
}

/// Whether `session` currently keeps a cluster alive.
#[must_use]
pub fn is_linked(session: SessionId) -> bool {
    REGISTRY.is_linked(session)
}

/// Number of live session → cluster associations, process-wide.
#[must_use]
pub fn linked_sessions() -> usize {
    REGISTRY.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idgen::next_session_id;

    struct Dependency {
        dropped: Arc<std::sync::atomic::AtomicBool>,
    }

    impl Drop for Dependency {
        fn drop(&mut self) {
            self.dropped.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    fn dependency() -> (Arc<Dependency>, Arc<std::sync::atomic::AtomicBool>) {
        let dropped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        (
            Arc::new(Dependency {
                dropped: Arc::clone(&dropped),
            }),
            dropped,
        )
    }

    #[test]
    fn test_entry_keeps_dependency_alive() {
        let registry = KeepAliveRegistry::new();
        let (dep, dropped) = dependency();
        let session = next_session_id();

        let guard = registry.link(session, Arc::clone(&dep));
        assert!(registry.is_linked(session));
        assert!(guard.dependency().is_some_and(|d| Arc::ptr_eq(&d, &dep)));
        drop(dep);
        assert!(!dropped.load(std::sync::atomic::Ordering::SeqCst));

        drop(guard);
        assert!(!registry.is_linked(session));
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_second_link_is_noop() {
        let registry = KeepAliveRegistry::new();
        let (first, first_dropped) = dependency();
        let (second, second_dropped) = dependency();
        let session = next_session_id();

        let guard = registry.link(session, first);
        let inert = registry.link(session, second);
        assert!(second_dropped.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(registry.len(), 1);

        drop(inert);
        assert!(registry.is_linked(session));
        assert!(!first_dropped.load(std::sync::atomic::Ordering::SeqCst));

        drop(guard);
        assert_eq!(registry.len(), 0);
        assert!(first_dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_entries_are_independent() {
        let registry = KeepAliveRegistry::new();
        let (dep, dropped) = dependency();
        let a = registry.link(next_session_id(), Arc::clone(&dep));
        let b = registry.link(next_session_id(), dep);

        drop(a);
        assert!(!dropped.load(std::sync::atomic::Ordering::SeqCst));
        drop(b);
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }
}
