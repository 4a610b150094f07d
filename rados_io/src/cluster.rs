//! Cluster handle.
//!
//! ```text
//! Configuring ──connect──▶ Connected
//!      │                       │
//!      └──shutdown / drop──▶ Shutdown ◀──shutdown / drop──┘
//! ```
//!
//! The native connection is owned by the handle and released exactly once:
//! by `shutdown` when connected, by discard when it never connected.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rados_runtime::{ClusterRef, NativeError, RadosRuntime};
use tracing::{debug, trace};

use crate::error::{
    check, Result, UsageError, ALREADY_CONNECTED, NOT_CONNECTED, SHUTDOWN_REUSE,
};
use crate::ioctx::IoCtx;

/// Observable state of a [`Cluster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    Configuring,
    Connected,
    Shutdown,
}

enum ClusterState {
    Configuring(ClusterRef),
    Connected(ClusterRef),
    Shutdown,
}

impl ClusterState {
    fn status(&self) -> ClusterStatus {
        match self {
            Self::Configuring(_) => ClusterStatus::Configuring,
            Self::Connected(_) => ClusterStatus::Connected,
            Self::Shutdown => ClusterStatus::Shutdown,
        }
    }
}

pub(crate) struct ClusterCore {
    runtime: Arc<dyn RadosRuntime>,
    state: Mutex<ClusterState>,
}

impl ClusterCore {
    pub(crate) fn is_shut_down(&self) -> bool {
        matches!(*self.state.lock(), ClusterState::Shutdown)
    }

    /// Lock the state, rejecting a shut-down handle.
    fn usable(&self) -> Result<MutexGuard<'_, ClusterState>> {
        let state = self.state.lock();
        if matches!(*state, ClusterState::Shutdown) {
            return Err(UsageError::new(1, SHUTDOWN_REUSE).into());
        }
        Ok(state)
    }

    /// Lock the state, requiring a connected handle.
    fn connected(&self) -> Result<(MutexGuard<'_, ClusterState>, ClusterRef)> {
        let state = self.usable()?;
        match *state {
            ClusterState::Connected(cluster) => Ok((state, cluster)),
            _ => Err(UsageError::new(1, NOT_CONNECTED).into()),
        }
    }

    /// Release the native connection, if still held, and end in `Shutdown`.
    fn release(&self, state: &mut ClusterState) {
        match std::mem::replace(state, ClusterState::Shutdown) {
            ClusterState::Connected(cluster) => {
                debug!(cluster = ?cluster, "cluster shutdown");
                self.runtime.shutdown(cluster);
            }
            ClusterState::Configuring(cluster) => {
                debug!(cluster = ?cluster, "cluster discarded without connecting");
                self.runtime.discard(cluster);
            }
            ClusterState::Shutdown => {}
        }
    }
}

impl Drop for ClusterCore {
    fn drop(&mut self) {
        trace!("cluster finalized");
        let mut state = std::mem::replace(self.state.get_mut(), ClusterState::Shutdown);
        self.release(&mut state);
    }
}

/// Connection to a storage cluster.
///
/// Clones share the same connection; it is released when [`Cluster::shutdown`]
/// is called or the last clone, and the last session opened from it, are
/// dropped.
#[derive(Clone)]
pub struct Cluster {
    core: Arc<ClusterCore>,
}

impl Cluster {
    pub(crate) fn create(runtime: Arc<dyn RadosRuntime>, id: Option<&str>) -> Result<Self> {
        let cluster = runtime.create(id).map_err(NativeError::from_code)?;
        debug!(cluster = ?cluster, id = ?id, "cluster created");
        Ok(Self {
            core: Arc::new(ClusterCore {
                runtime,
                state: Mutex::new(ClusterState::Configuring(cluster)),
            }),
        })
    }

    /// Load a configuration file; `None` searches the default locations.
    ///
    /// # Errors
    /// Usage error after shutdown; the native error otherwise.
    pub fn conf_read_file(&self, path: Option<&str>) -> Result<()> {
        let state = self.core.usable()?;
        let (ClusterState::Configuring(cluster) | ClusterState::Connected(cluster)) = *state else {
            return Err(UsageError::new(1, SHUTDOWN_REUSE).into());
        };
        check(self.core.runtime.conf_read_file(cluster, path))?;
        Ok(())
    }

    /// Connect to the cluster. A failed attempt leaves the handle
    /// configurable, so it may be retried.
    ///
    /// # Errors
    /// Usage error after shutdown or when already connected; the native
    /// error if the connection attempt fails.
    pub fn connect(&self) -> Result<()> {
        let mut state = self.core.usable()?;
        let cluster = match *state {
            ClusterState::Configuring(cluster) => cluster,
            _ => return Err(UsageError::new(1, ALREADY_CONNECTED).into()),
        };
        let ret = self.core.runtime.connect(cluster);
        check(ret)?;
        *state = ClusterState::Connected(cluster);
        debug!(cluster = ?cluster, "cluster connected");
        Ok(())
    }

    /// Valid in every state, including after shutdown.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.core.state.lock(), ClusterState::Connected(_))
    }

    #[must_use]
    pub fn status(&self) -> ClusterStatus {
        self.core.state.lock().status()
    }

    /// Open an I/O session on `pool`.
    ///
    /// The session keeps this cluster alive until it is finalized, even if
    /// every `Cluster` clone is dropped first.
    ///
    /// # Errors
    /// Usage error unless connected; the native error if the pool cannot be
    /// opened, in which case nothing is registered.
    pub fn open_ioctx(&self, pool: &str) -> Result<IoCtx> {
        let (_state, cluster) = self.core.connected()?;
        let io = self
            .core
            .runtime
            .ioctx_create(cluster, pool)
            .map_err(NativeError::from_code)?;
        debug!(cluster = ?cluster, io = ?io, pool = pool, "ioctx opened");
        Ok(IoCtx::open(
            Arc::clone(&self.core.runtime),
            io,
            Arc::clone(&self.core),
        ))
    }

    /// Disconnect.
    ///
    /// The native library frees the sessions opened from this cluster along
    /// with the connection. Their handles stay valid but every operation
    /// fails with `-ENOTCONN`, and they never reach the native library again.
    ///
    /// # Errors
    /// Usage error if the handle is already shut down.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.core.usable()?;
        self.core.release(&mut state);
        Ok(())
    }

    /// Register this client as a daemon of `service`, with empty metadata.
    ///
    /// # Errors
    /// Usage error unless connected; the native error otherwise.
    pub fn register_service(&self, service: &str, daemon: &str) -> Result<()> {
        let (_state, cluster) = self.core.connected()?;
        check(self.core.runtime.service_register(cluster, service, daemon, ""))?;
        Ok(())
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
