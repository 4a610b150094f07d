//! I/O session on one pool.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rados_runtime::errno::ENOTCONN;
use rados_runtime::{BufferCell, IoCtxRef, NativeError, RadosRuntime, StatResult};
use tracing::{debug, trace};

use crate::cluster::ClusterCore;
use crate::completion::Completion;
use crate::error::{
    buffer_len, check, non_negative, Result, UsageError, CLOSED_REUSE, NEGATIVE_OFFSET,
};
use crate::idgen::{next_session_id, SessionId};
use crate::keepalive::{self, KeepAlive};

enum SessionState {
    Open(IoCtxRef),
    Closed,
}

/// Sets the locator key for the duration of one native call and clears it
/// on drop, whatever the call returned.
struct LocatorScope<'a> {
    runtime: &'a dyn RadosRuntime,
    io: IoCtxRef,
    active: bool,
}

impl<'a> LocatorScope<'a> {
    fn enter(runtime: &'a dyn RadosRuntime, io: IoCtxRef, key: Option<&str>) -> Self {
        if let Some(key) = key {
            runtime.locator_set_key(io, Some(key));
        }
        Self {
            runtime,
            io,
            active: key.is_some(),
        }
    }
}

impl Drop for LocatorScope<'_> {
    fn drop(&mut self) {
        if self.active {
            self.runtime.locator_set_key(self.io, None);
        }
    }
}

struct IoCtxCore {
    id: SessionId,
    runtime: Arc<dyn RadosRuntime>,
    state: Mutex<SessionState>,
    // Released after `drop` has destroyed the native session.
    keep_alive: KeepAlive<'static, ClusterCore>,
}

impl IoCtxCore {
    /// A shut-down cluster took the native session with it.
    fn cluster_gone(&self) -> bool {
        self.keep_alive
            .dependency()
            .map_or(true, |cluster| cluster.is_shut_down())
    }

    fn destroy(&self, io: IoCtxRef) {
        if self.cluster_gone() {
            debug!(session = %self.id, io = ?io, "native session freed with its cluster");
            return;
        }
        self.runtime.ioctx_destroy(io);
    }
}

impl Drop for IoCtxCore {
    fn drop(&mut self) {
        if let SessionState::Open(io) =
            std::mem::replace(self.state.get_mut(), SessionState::Closed)
        {
            debug!(session = %self.id, io = ?io, "ioctx finalized");
            self.destroy(io);
        }
    }
}

/// I/O session for object operations on one pool.
///
/// Every operation takes an optional locator key that applies to that call
/// only. Clones share the session.
#[derive(Clone)]
pub struct IoCtx {
    core: Arc<IoCtxCore>,
}

impl IoCtx {
    pub(crate) fn open(
        runtime: Arc<dyn RadosRuntime>,
        io: IoCtxRef,
        cluster: Arc<ClusterCore>,
    ) -> Self {
        let id = next_session_id();
        let keep_alive = keepalive::link(id, cluster);
        Self {
            core: Arc::new(IoCtxCore {
                id,
                runtime,
                state: Mutex::new(SessionState::Open(io)),
                keep_alive,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.core.id
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(*self.core.state.lock(), SessionState::Open(_))
    }

    /// Run `f` with the native session, holding the state lock.
    fn with_open<T>(&self, f: impl FnOnce(IoCtxRef) -> Result<T>) -> Result<T> {
        let state = self.core.state.lock();
        let SessionState::Open(io) = *state else {
            return Err(UsageError::new(1, CLOSED_REUSE).into());
        };
        if self.core.cluster_gone() {
            return Err(NativeError::from_code(-ENOTCONN).into());
        }
        f(io)
    }

    fn scope(&self, io: IoCtxRef, locator: Option<&str>) -> LocatorScope<'_> {
        LocatorScope::enter(self.core.runtime.as_ref(), io, locator)
    }

    /// Release the native session.
    ///
    /// The cluster stays alive until the last clone of this handle is
    /// dropped.
    ///
    /// # Errors
    /// Usage error if the session is already closed.
    pub fn close(&self) -> Result<()> {
        let mut state = self.core.state.lock();
        match std::mem::replace(&mut *state, SessionState::Closed) {
            SessionState::Open(io) => {
                debug!(session = %self.core.id, io = ?io, "ioctx closed");
                self.core.destroy(io);
                Ok(())
            }
            SessionState::Closed => Err(UsageError::new(1, CLOSED_REUSE).into()),
        }
    }

    /// Size and modification time of an object.
    ///
    /// # Errors
    /// Usage error if closed; the native error otherwise.
    pub fn stat(&self, locator: Option<&str>, oid: &str) -> Result<StatResult> {
        self.with_open(|io| {
            let _scope = self.scope(io, locator);
            let stat = self
                .core
                .runtime
                .stat(io, oid)
                .map_err(NativeError::from_code)?;
            Ok(stat)
        })
    }

    /// Read up to `length` bytes at `offset`. Returns the bytes actually read,
    /// possibly fewer than requested or none.
    ///
    /// # Errors
    /// Usage error if closed or if `length` or `offset` is negative; the
    /// native error otherwise, `-ENOMEM` when the buffer cannot be allocated.
    pub fn read(
        &self,
        locator: Option<&str>,
        oid: &str,
        length: i64,
        offset: i64,
    ) -> Result<Vec<u8>> {
        self.with_open(|io| {
            let len = buffer_len(length, 4)?;
            let offset = non_negative(offset, 5, NEGATIVE_OFFSET)?;
            let mut cell = BufferCell::alloc(len).ok_or_else(NativeError::out_of_memory)?;

            let ret = {
                let _scope = self.scope(io, locator);
                self.core
                    .runtime
                    .read(io, oid, &mut cell.as_mut_slice()[..len], offset)
            };
            let n = check(ret)?;
            trace!(session = %self.core.id, oid = oid, requested = len, read = n, "read");
            Ok(cell.to_vec(n.min(len)))
        })
    }

    /// Replace the whole object with `data`, creating it if needed.
    ///
    /// # Errors
    /// Usage error if closed; the native error otherwise.
    pub fn write_full(&self, locator: Option<&str>, oid: &str, data: &[u8]) -> Result<()> {
        self.with_open(|io| {
            let _scope = self.scope(io, locator);
            check(self.core.runtime.write_full(io, oid, data))?;
            Ok(())
        })
    }

    /// # Errors
    /// Usage error if closed; the native error otherwise.
    pub fn remove(&self, locator: Option<&str>, oid: &str) -> Result<()> {
        self.with_open(|io| {
            let _scope = self.scope(io, locator);
            check(self.core.runtime.remove(io, oid))?;
            Ok(())
        })
    }

    /// Start an asynchronous stat.
    ///
    /// # Errors
    /// Usage error if closed; the native error if the completion cannot be
    /// created or the operation cannot be issued. A completion that was
    /// created but not issued is released before returning.
    pub fn aio_stat(&self, locator: Option<&str>, oid: &str) -> Result<Completion> {
        self.with_open(|io| {
            let completion = Completion::stat(Arc::clone(&self.core.runtime))?;
            let token = completion.token()?;
            let target = completion.stat_target()?;

            let ret = {
                let _scope = self.scope(io, locator);
                self.core.runtime.aio_stat(io, oid, token, target)
            };
            check(ret)?;
            Ok(completion)
        })
    }

    /// Start an asynchronous read of up to `length` bytes at `offset`.
    ///
    /// The buffer is allocated before any native call.
    ///
    /// # Errors
    /// As [`IoCtx::read`], plus the completion errors of [`IoCtx::aio_stat`].
    pub fn aio_read(
        &self,
        locator: Option<&str>,
        oid: &str,
        length: i64,
        offset: i64,
    ) -> Result<Completion> {
        self.with_open(|io| {
            let len = buffer_len(length, 4)?;
            let offset = non_negative(offset, 5, NEGATIVE_OFFSET)?;
            let cell = BufferCell::alloc(len).ok_or_else(NativeError::out_of_memory)?;

            let completion = Completion::read(Arc::clone(&self.core.runtime), cell, len)?;
            let token = completion.token()?;
            let target = completion.read_target()?;

            let ret = {
                let _scope = self.scope(io, locator);
                self.core
                    .runtime
                    .aio_read(io, oid, token, target, len, offset)
            };
            check(ret)?;
            Ok(completion)
        })
    }
}

impl fmt::Debug for IoCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoCtx")
            .field("id", &self.core.id)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
