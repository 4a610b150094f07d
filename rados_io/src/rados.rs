//! Library entry point.

use std::os::raw::c_int;
use std::sync::Arc;

use rados_runtime::RadosRuntime;

use crate::cluster::Cluster;
use crate::error::Result;

/// Binds the handle layer to a native backend.
#[derive(Clone)]
pub struct Rados {
    runtime: Arc<dyn RadosRuntime>,
}

impl Rados {
    pub fn new(runtime: Arc<dyn RadosRuntime>) -> Self {
        Self { runtime }
    }

    /// Backed by the system librados.
    #[cfg(feature = "librados")]
    #[must_use]
    pub fn librados() -> Self {
        Self::new(Arc::new(rados_runtime::FfiRadosRuntime::new()))
    }

    /// Native library version as `(major, minor, extra)`.
    #[must_use]
    pub fn version(&self) -> (c_int, c_int, c_int) {
        self.runtime.version()
    }

    /// New cluster handle for user `id`, not yet connected.
    ///
    /// # Errors
    /// The native error if the connection object cannot be allocated.
    pub fn create(&self, id: Option<&str>) -> Result<Cluster> {
        Cluster::create(Arc::clone(&self.runtime), id)
    }
}

impl std::fmt::Debug for Rados {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rados")
            .field("version", &self.version())
            .finish()
    }
}
