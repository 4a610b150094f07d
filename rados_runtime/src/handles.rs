//! Opaque references to native objects and the result storage shared with
//! native worker threads.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::buffer::BufferCell;

/// Native cluster connection (`rados_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterRef(usize);

impl ClusterRef {
    #[must_use]
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Native per-pool session (`rados_ioctx_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoCtxRef(usize);

impl IoCtxRef {
    #[must_use]
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Native completion token (`rados_completion_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionRef(usize);

impl CompletionRef {
    #[must_use]
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Object size and modification time (seconds since the epoch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatResult {
    pub size: u64,
    pub mtime: i64,
}

/// Where an asynchronous stat stores its result.
///
/// Shared between the completion handle and the backend: the backend keeps
/// its clone until the operation has finished.
pub type StatTarget = Arc<Mutex<StatResult>>;

/// Where an asynchronous read stores its bytes. Same ownership rule as
/// [`StatTarget`].
pub type ReadTarget = Arc<Mutex<BufferCell>>;

#[must_use]
pub fn stat_target() -> StatTarget {
    Arc::new(Mutex::new(StatResult::default()))
}

#[must_use]
pub fn read_target(cell: BufferCell) -> ReadTarget {
    Arc::new(Mutex::new(cell))
}
