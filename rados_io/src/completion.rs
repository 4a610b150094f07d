//! Handle to one asynchronous operation.
//!
//! A completion is created by [`IoCtx::aio_stat`](crate::IoCtx::aio_stat) or
//! [`IoCtx::aio_read`](crate::IoCtx::aio_read) and knows from then on which
//! result shape it carries. The native token is released exactly once, by
//! [`Completion::release`] or when the last clone is dropped, whichever comes
//! first; the active-completion counter follows the handle. A thread blocked
//! in [`Completion::wait_for_complete`] keeps the native token until it
//! returns, so a release never pulls the token from under a waiter.
//!
//! Releasing a completion whose operation is still running is allowed. The
//! backend holds its own reference to the result storage until the operation
//! finishes, so the native worker never writes into freed memory.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rados_runtime::{
    read_target, stat_target, BufferCell, CompletionRef, NativeError, RadosRuntime, ReadTarget,
    StatResult, StatTarget,
};
use tracing::{debug, trace};

use crate::counter;
use crate::error::{check, RadosError, Result, UsageError, RELEASED_REUSE};

/// Result shape of a completion, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AioKind {
    Stat,
    Read,
}

/// Result of a finished asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AioValue {
    Stat(StatResult),
    /// Bytes actually read.
    Read(Vec<u8>),
}

impl AioValue {
    #[must_use]
    pub fn kind(&self) -> AioKind {
        match self {
            Self::Stat(_) => AioKind::Stat,
            Self::Read(_) => AioKind::Read,
        }
    }

    #[must_use]
    pub fn into_stat(self) -> Option<StatResult> {
        match self {
            Self::Stat(stat) => Some(stat),
            Self::Read(_) => None,
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Read(bytes) => Some(bytes),
            Self::Stat(_) => None,
        }
    }
}

enum AioTarget {
    Stat(StatTarget),
    Read {
        target: Option<ReadTarget>,
        length: usize,
    },
}

impl AioTarget {
    fn kind(&self) -> AioKind {
        match self {
            Self::Stat(_) => AioKind::Stat,
            Self::Read { .. } => AioKind::Read,
        }
    }
}

/// Owner of the native token. The token is released when the last holder
/// drops: the completion handle, or a thread still inside
/// [`Completion::wait_for_complete`].
struct Token {
    runtime: Arc<dyn RadosRuntime>,
    raw: CompletionRef,
}

impl Drop for Token {
    fn drop(&mut self) {
        self.runtime.aio_release(self.raw);
        trace!(token = ?self.raw, "native completion released");
    }
}

struct Slots {
    token: Option<Arc<Token>>,
    target: AioTarget,
}

impl Slots {
    fn token(&self) -> Result<&Token> {
        self.token
            .as_deref()
            .ok_or_else(|| UsageError::new(1, RELEASED_REUSE).into())
    }

    fn release(&mut self) {
        if let Some(token) = self.token.take() {
            counter::completion_released();
            debug!(token = ?token.raw, kind = ?self.target.kind(), "completion released");
        }
        if let AioTarget::Read { target, .. } = &mut self.target {
            // The backend keeps its own clone while the operation runs; the
            // cell is then freed when that clone goes away.
            if let Some(Ok(cell)) = target.take().map(Arc::try_unwrap) {
                cell.into_inner().free();
            }
        }
    }
}

struct CompletionCore {
    slots: RwLock<Slots>,
}

impl Drop for CompletionCore {
    fn drop(&mut self) {
        self.slots.get_mut().release();
    }
}

/// Handle to an asynchronous stat or read.
///
/// Clones share the same native token.
#[derive(Clone)]
pub struct Completion {
    core: Arc<CompletionCore>,
}

impl Completion {
    fn create(runtime: Arc<dyn RadosRuntime>, target: AioTarget) -> Result<Self> {
        let token = runtime
            .aio_create_completion()
            .map_err(NativeError::from_code)?;
        counter::completion_created();
        debug!(token = ?token, kind = ?target.kind(), "completion created");
        Ok(Self {
            core: Arc::new(CompletionCore {
                slots: RwLock::new(Slots {
                    token: Some(Arc::new(Token {
                        runtime,
                        raw: token,
                    })),
                    target,
                }),
            }),
        })
    }

    pub(crate) fn stat(runtime: Arc<dyn RadosRuntime>) -> Result<Self> {
        Self::create(runtime, AioTarget::Stat(stat_target()))
    }

    /// `cell` must hold at least `length` bytes.
    pub(crate) fn read(
        runtime: Arc<dyn RadosRuntime>,
        cell: BufferCell,
        length: usize,
    ) -> Result<Self> {
        Self::create(
            runtime,
            AioTarget::Read {
                target: Some(read_target(cell)),
                length,
            },
        )
    }

    pub(crate) fn token(&self) -> Result<CompletionRef> {
        Ok(self.core.slots.read().token()?.raw)
    }

    pub(crate) fn stat_target(&self) -> Result<StatTarget> {
        match &self.core.slots.read().target {
            AioTarget::Stat(target) => Ok(Arc::clone(target)),
            AioTarget::Read { .. } => Err(RadosError::Internal("not a stat completion")),
        }
    }

    pub(crate) fn read_target(&self) -> Result<ReadTarget> {
        match &self.core.slots.read().target {
            AioTarget::Read {
                target: Some(target),
                ..
            } => Ok(Arc::clone(target)),
            _ => Err(RadosError::Internal("no read target")),
        }
    }

    #[must_use]
    pub fn kind(&self) -> AioKind {
        self.core.slots.read().target.kind()
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.core.slots.read().token.is_none()
    }

    /// Whether the operation has finished. Never blocks.
    ///
    /// # Errors
    /// Usage error after release.
    pub fn is_complete(&self) -> Result<bool> {
        let slots = self.core.slots.read();
        let token = slots.token()?;
        Ok(token.runtime.aio_is_complete(token.raw))
    }

    /// Block until the operation has finished.
    ///
    /// No lock is held while waiting: other threads may poll or release
    /// meanwhile. A release only takes effect natively once this call
    /// returns.
    ///
    /// # Errors
    /// Usage error after release.
    pub fn wait_for_complete(&self) -> Result<()> {
        let token = self
            .core
            .slots
            .read()
            .token
            .clone()
            .ok_or(UsageError::new(1, RELEASED_REUSE))?;
        check(token.runtime.aio_wait_for_complete(token.raw))?;
        Ok(())
    }

    /// Result of the operation: the stat, or the bytes actually read.
    ///
    /// Meaningful once [`Completion::is_complete`] is true.
    ///
    /// # Errors
    /// Usage error after release; the native error the operation failed with.
    pub fn get_return_value(&self) -> Result<AioValue> {
        let slots = self.core.slots.read();
        let token = slots.token()?;
        let n = check(token.runtime.aio_get_return_value(token.raw))?;
        match &slots.target {
            AioTarget::Stat(target) => Ok(AioValue::Stat(*target.lock())),
            AioTarget::Read {
                target: Some(target),
                length,
            } => Ok(AioValue::Read(target.lock().to_vec(n.min(*length)))),
            AioTarget::Read { target: None, .. } => {
                Err(RadosError::Internal("read buffer missing on live completion"))
            }
        }
    }

    /// Release the native token and the read buffer. Never blocks. Later
    /// calls, and the final drop, do nothing.
    pub fn release(&self) {
        self.core.slots.write().release();
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("kind", &self.kind())
            .field("released", &self.is_released())
            .finish()
    }
}
