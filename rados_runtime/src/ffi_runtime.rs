use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::errno::EINVAL;
use crate::handles::{
    ClusterRef, CompletionRef, IoCtxRef, ReadTarget, StatResult, StatTarget,
};
use crate::librados as ffi;
use crate::runtime_trait::RadosRuntime;

/// Result storage of an issued operation, kept alive until it completes.
#[derive(Clone)]
enum InFlight {
    Stat(StatTarget),
    Read(ReadTarget),
}

/// FFI-based implementation of `RadosRuntime`.
/// Uses the C functions of the system librados.
pub struct FfiRadosRuntime {
    in_flight: Mutex<HashMap<CompletionRef, InFlight>>,
}

impl FfiRadosRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for FfiRadosRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn c_string(s: &str) -> Result<CString, c_int> {
    CString::new(s).map_err(|_| -EINVAL) // Interior null byte
}

fn c_opt_string(s: Option<&str>) -> Result<Option<CString>, c_int> {
    s.map(c_string).transpose()
}

fn opt_ptr(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

fn cluster_ptr(cluster: ClusterRef) -> ffi::rados_t {
    cluster.as_raw() as ffi::rados_t
}

fn io_ptr(io: IoCtxRef) -> ffi::rados_ioctx_t {
    io.as_raw() as ffi::rados_ioctx_t
}

fn completion_ptr(completion: CompletionRef) -> ffi::rados_completion_t {
    completion.as_raw() as ffi::rados_completion_t
}

impl RadosRuntime for FfiRadosRuntime {
    fn version(&self) -> (c_int, c_int, c_int) {
        let (mut major, mut minor, mut extra) = (0, 0, 0);
        unsafe { ffi::rados_version(&mut major, &mut minor, &mut extra) };
        (major, minor, extra)
    }

    fn create(&self, id: Option<&str>) -> Result<ClusterRef, c_int> {
        let id = c_opt_string(id)?;
        let mut cluster: ffi::rados_t = ptr::null_mut();
        let ret = unsafe { ffi::rados_create(&mut cluster, opt_ptr(&id)) };
        if ret < 0 {
            return Err(ret);
        }
        Ok(ClusterRef::from_raw(cluster as usize))
    }

    fn conf_read_file(&self, cluster: ClusterRef, path: Option<&str>) -> c_int {
        let path = match c_opt_string(path) {
            Ok(path) => path,
            Err(ret) => return ret,
        };
        unsafe { ffi::rados_conf_read_file(cluster_ptr(cluster), opt_ptr(&path)) }
    }

    fn connect(&self, cluster: ClusterRef) -> c_int {
        unsafe { ffi::rados_connect(cluster_ptr(cluster)) }
    }

    fn shutdown(&self, cluster: ClusterRef) {
        unsafe { ffi::rados_shutdown(cluster_ptr(cluster)) }
    }

    fn discard(&self, cluster: ClusterRef) {
        // librados has no separate destructor: rados_shutdown also releases
        // a handle that never connected.
        unsafe { ffi::rados_shutdown(cluster_ptr(cluster)) }
    }

    fn service_register(
        &self,
        cluster: ClusterRef,
        service: &str,
        daemon: &str,
        metadata: &str,
    ) -> c_int {
        let (Ok(service), Ok(daemon), Ok(metadata)) =
            (c_string(service), c_string(daemon), c_string(metadata))
        else {
            return -EINVAL;
        };
        unsafe {
            ffi::rados_service_register(
                cluster_ptr(cluster),
                service.as_ptr(),
                daemon.as_ptr(),
                metadata.as_ptr(),
            )
        }
    }

    fn ioctx_create(&self, cluster: ClusterRef, pool: &str) -> Result<IoCtxRef, c_int> {
        let pool = c_string(pool)?;
        let mut io: ffi::rados_ioctx_t = ptr::null_mut();
        let ret = unsafe { ffi::rados_ioctx_create(cluster_ptr(cluster), pool.as_ptr(), &mut io) };
        if ret < 0 {
            return Err(ret);
        }
        Ok(IoCtxRef::from_raw(io as usize))
    }

    fn ioctx_destroy(&self, io: IoCtxRef) {
        unsafe { ffi::rados_ioctx_destroy(io_ptr(io)) }
    }

    fn locator_set_key(&self, io: IoCtxRef, key: Option<&str>) {
        let Ok(key) = c_opt_string(key) else {
            warn!("locator key contains a null byte, clearing instead");
            unsafe { ffi::rados_ioctx_locator_set_key(io_ptr(io), ptr::null()) };
            return;
        };
        unsafe { ffi::rados_ioctx_locator_set_key(io_ptr(io), opt_ptr(&key)) }
    }

    fn stat(&self, io: IoCtxRef, oid: &str) -> Result<StatResult, c_int> {
        let oid = c_string(oid)?;
        let mut result = StatResult::default();
        let ret =
            unsafe { ffi::rados_stat(io_ptr(io), oid.as_ptr(), &mut result.size, &mut result.mtime) };
        if ret < 0 {
            return Err(ret);
        }
        Ok(result)
    }

    fn read(&self, io: IoCtxRef, oid: &str, buffer: &mut [u8], offset: u64) -> c_int {
        let Ok(oid) = c_string(oid) else {
            return -EINVAL;
        };
        unsafe {
            ffi::rados_read(
                io_ptr(io),
                oid.as_ptr(),
                buffer.as_mut_ptr().cast::<c_char>(),
                buffer.len(),
                offset,
            )
        }
    }

    fn write_full(&self, io: IoCtxRef, oid: &str, data: &[u8]) -> c_int {
        let Ok(oid) = c_string(oid) else {
            return -EINVAL;
        };
        unsafe {
            ffi::rados_write_full(io_ptr(io), oid.as_ptr(), data.as_ptr().cast::<c_char>(), data.len())
        }
    }

    fn remove(&self, io: IoCtxRef, oid: &str) -> c_int {
        let Ok(oid) = c_string(oid) else {
            return -EINVAL;
        };
        unsafe { ffi::rados_remove(io_ptr(io), oid.as_ptr()) }
    }

    fn aio_create_completion(&self) -> Result<CompletionRef, c_int> {
        let mut completion: ffi::rados_completion_t = ptr::null_mut();
        let ret = unsafe {
            ffi::rados_aio_create_completion(ptr::null_mut(), None, None, &mut completion)
        };
        if ret < 0 {
            return Err(ret);
        }
        Ok(CompletionRef::from_raw(completion as usize))
    }

    fn aio_stat(
        &self,
        io: IoCtxRef,
        oid: &str,
        completion: CompletionRef,
        target: StatTarget,
    ) -> c_int {
        let Ok(oid) = c_string(oid) else {
            return -EINVAL;
        };
        let slot = target.data_ptr();
        // SAFETY: the slot lives in `target`, which `in_flight` keeps alive
        // until the operation has completed (see `aio_release`).
        let (psize, pmtime) =
            unsafe { (ptr::addr_of_mut!((*slot).size), ptr::addr_of_mut!((*slot).mtime)) };
        self.in_flight.lock().insert(completion, InFlight::Stat(target));

        let ret = unsafe {
            ffi::rados_aio_stat(io_ptr(io), oid.as_ptr(), completion_ptr(completion), psize, pmtime)
        };
        if ret < 0 {
            self.in_flight.lock().remove(&completion);
        }
        ret
    }

    fn aio_read(
        &self,
        io: IoCtxRef,
        oid: &str,
        completion: CompletionRef,
        target: ReadTarget,
        len: usize,
        offset: u64,
    ) -> c_int {
        let Ok(oid) = c_string(oid) else {
            return -EINVAL;
        };
        let buffer = {
            let mut cell = target.lock();
            if cell.capacity() < len {
                return -EINVAL;
            }
            // The block never moves while the cell is alive.
            cell.as_mut_ptr()
        };
        self.in_flight.lock().insert(completion, InFlight::Read(target));

        let ret = unsafe {
            ffi::rados_aio_read(
                io_ptr(io),
                oid.as_ptr(),
                completion_ptr(completion),
                buffer.cast::<c_char>(),
                len,
                offset,
            )
        };
        if ret < 0 {
            self.in_flight.lock().remove(&completion);
        }
        ret
    }

    fn aio_is_complete(&self, completion: CompletionRef) -> bool {
        unsafe { ffi::rados_aio_is_complete(completion_ptr(completion)) != 0 }
    }

    fn aio_wait_for_complete(&self, completion: CompletionRef) -> c_int {
        unsafe { ffi::rados_aio_wait_for_complete(completion_ptr(completion)) }
    }

    fn aio_get_return_value(&self, completion: CompletionRef) -> c_int {
        unsafe { ffi::rados_aio_get_return_value(completion_ptr(completion)) }
    }

    fn aio_release(&self, completion: CompletionRef) {
        let target = self.in_flight.lock().remove(&completion);
        if target.is_none() || self.aio_is_complete(completion) {
            unsafe { ffi::rados_aio_release(completion_ptr(completion)) };
            return;
        }

        // Still pending: librados keeps writing into the target after the
        // release, so the target must outlive the operation.
        trace!(completion = ?completion, "abandoning pending completion");
        let keep = target.clone();
        let raw = completion.as_raw();
        let spawned = std::thread::Builder::new()
            .name("rados-aio-abandon".to_string())
            .spawn(move || {
                let completion = raw as ffi::rados_completion_t;
                unsafe {
                    ffi::rados_aio_wait_for_complete(completion);
                    ffi::rados_aio_release(completion);
                }
                drop(target);
            });
        if let Err(e) = spawned {
            warn!(completion = ?completion, error = %e, "cannot spawn abandon thread, waiting inline");
            unsafe {
                ffi::rados_aio_wait_for_complete(completion_ptr(completion));
                ffi::rados_aio_release(completion_ptr(completion));
            }
        }
        drop(keep);
    }
}
