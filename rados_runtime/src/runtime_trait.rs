use std::os::raw::c_int;

use crate::handles::{
    ClusterRef, CompletionRef, IoCtxRef, ReadTarget, StatResult, StatTarget,
};

/// Operations of the native storage client.
///
/// Provides an abstraction layer over librados. This allows for both the
/// FFI-based implementation (production) and an in-memory implementation
/// (testing, demos).
///
/// Every method mirrors one librados call. Status codes follow the librados
/// convention: `>= 0` is success, negative is `-errno`. Implementations do not
/// track handle state; callers guarantee that a reference is live when it is
/// passed in and is released at most once.
pub trait RadosRuntime: Send + Sync {
    /// Library version as `(major, minor, extra)`.
    fn version(&self) -> (c_int, c_int, c_int);

    /// Allocate a cluster connection object for the given user.
    fn create(&self, id: Option<&str>) -> Result<ClusterRef, c_int>;

    /// Load configuration. `None` searches the default locations.
    fn conf_read_file(&self, cluster: ClusterRef, path: Option<&str>) -> c_int;

    fn connect(&self, cluster: ClusterRef) -> c_int;

    /// Disconnect and release a connected cluster.
    fn shutdown(&self, cluster: ClusterRef);

    /// Release a cluster object that never connected.
    fn discard(&self, cluster: ClusterRef);

    fn service_register(
        &self,
        cluster: ClusterRef,
        service: &str,
        daemon: &str,
        metadata: &str,
    ) -> c_int;

    fn ioctx_create(&self, cluster: ClusterRef, pool: &str) -> Result<IoCtxRef, c_int>;

    fn ioctx_destroy(&self, io: IoCtxRef);

    /// Set (`Some`) or clear (`None`) the locator key used by later calls.
    fn locator_set_key(&self, io: IoCtxRef, key: Option<&str>);

    fn stat(&self, io: IoCtxRef, oid: &str) -> Result<StatResult, c_int>;

    /// Read up to `buffer.len()` bytes at `offset`. Returns the number of bytes
    /// read, which may be less than requested.
    fn read(&self, io: IoCtxRef, oid: &str, buffer: &mut [u8], offset: u64) -> c_int;

    /// Replace the whole object with `data`.
    fn write_full(&self, io: IoCtxRef, oid: &str, data: &[u8]) -> c_int;

    fn remove(&self, io: IoCtxRef, oid: &str) -> c_int;

    fn aio_create_completion(&self) -> Result<CompletionRef, c_int>;

    /// Start an asynchronous stat. The result is written into `target` by a
    /// native worker once the operation completes.
    fn aio_stat(
        &self,
        io: IoCtxRef,
        oid: &str,
        completion: CompletionRef,
        target: StatTarget,
    ) -> c_int;

    /// Start an asynchronous read of `len` bytes into `target`.
    ///
    /// `target` must hold at least `len` bytes. The backend keeps its clone
    /// of `target` alive until the operation has finished, even if the
    /// completion is released earlier.
    fn aio_read(
        &self,
        io: IoCtxRef,
        oid: &str,
        completion: CompletionRef,
        target: ReadTarget,
        len: usize,
        offset: u64,
    ) -> c_int;

    fn aio_is_complete(&self, completion: CompletionRef) -> bool;

    /// Block the calling thread until the operation completes.
    fn aio_wait_for_complete(&self, completion: CompletionRef) -> c_int;

    fn aio_get_return_value(&self, completion: CompletionRef) -> c_int;

    /// Release the token. A still pending operation is abandoned: it runs to
    /// the end and its target is dropped afterwards.
    fn aio_release(&self, completion: CompletionRef);
}
