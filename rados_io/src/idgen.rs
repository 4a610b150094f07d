use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an I/O session, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Thread-safe ID generator
#[derive(Debug)]
pub(crate) struct IdGen {
    next_id: AtomicU64,
}

impl IdGen {
    pub(crate) const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the next unique ID
    pub(crate) fn get_next(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

static SESSION_IDS: IdGen = IdGen::new();

pub(crate) fn next_session_id() -> SessionId {
    SESSION_IDS.get_next()
}
