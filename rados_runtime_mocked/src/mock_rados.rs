use std::collections::HashMap;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rados_runtime::errno::{EBADF, EINVAL, EISCONN, ENOENT, ENOTCONN};
use rados_runtime::{
    ClusterRef, CompletionRef, IoCtxRef, RadosRuntime, ReadTarget, StatResult, StatTarget,
};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::completion::MockCompletion;
use crate::conf::read_conf_file;
use crate::config::MockConfig;
use crate::store::{ObjectKey, ObjectStore};

/// Calls that can be made to fail with [`MockRados::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Create,
    ConfReadFile,
    Connect,
    ServiceRegister,
    IoCtxCreate,
    AioCreateCompletion,
    /// Issuing `aio_stat` or `aio_read`.
    AioIssue,
}

/// Lifecycle calls recorded by the mock, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    ClusterCreated(ClusterRef),
    Connected(ClusterRef),
    Shutdown(ClusterRef),
    Discarded(ClusterRef),
    IoCtxCreated(IoCtxRef),
    IoCtxDestroyed(IoCtxRef),
    CompletionCreated(CompletionRef),
    CompletionReleased(CompletionRef),
}

struct ClusterEntry {
    connected: bool,
    options: HashMap<String, String>,
}

struct IoCtxEntry {
    cluster: ClusterRef,
    pool: String,
    locator: Option<String>,
}

#[derive(Default)]
struct MockState {
    next_id: usize,
    store: ObjectStore,
    clusters: HashMap<ClusterRef, ClusterEntry>,
    ioctxs: HashMap<IoCtxRef, IoCtxEntry>,
    completions: HashMap<CompletionRef, Arc<MockCompletion>>,
    failures: HashMap<MockOp, c_int>,
    services: Vec<(String, String)>,
}

impl MockState {
    fn next_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    fn take_failure(&mut self, op: MockOp) -> Result<(), c_int> {
        match self.failures.remove(&op) {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    /// Pool and object address for a call on `io`, honouring its locator key.
    fn address(&self, io: IoCtxRef, oid: &str) -> Result<(String, ObjectKey), c_int> {
        let entry = self.ioctxs.get(&io).ok_or(-EBADF)?;
        let connected = self
            .clusters
            .get(&entry.cluster)
            .is_some_and(|cluster| cluster.connected);
        if !connected {
            return Err(-ENOTCONN);
        }
        Ok((entry.pool.clone(), ObjectKey::new(entry.locator.as_deref(), oid)))
    }
}

/// In-memory cluster.
///
/// Cheap to share: wrap it in an `Arc` and hand clones to the handle layer
/// and to the test that inspects it.
pub struct MockRados {
    state: Arc<Mutex<MockState>>,
    events: Mutex<Vec<MockEvent>>,
    gate: watch::Sender<bool>,
    config: MockConfig,
    workers: tokio::runtime::Runtime,
}

impl MockRados {
    /// Mock with the default configuration.
    ///
    /// # Errors
    /// Fails if the worker threads cannot be started.
    pub fn new() -> std::io::Result<Self> {
        Self::with_config(MockConfig::default())
    }

    /// # Errors
    /// Fails if the worker threads cannot be started.
    pub fn with_config(config: MockConfig) -> std::io::Result<Self> {
        let workers = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.workers.max(1))
            .thread_name("mock-rados-worker")
            .enable_time()
            .build()?;
        let (gate, _) = watch::channel(false);
        Ok(Self {
            state: Arc::new(Mutex::new(MockState::default())),
            events: Mutex::new(Vec::new()),
            gate,
            config,
            workers,
        })
    }

    /// Returns `false` if the pool already existed.
    pub fn create_pool(&self, name: &str) -> bool {
        self.state.lock().store.create_pool(name)
    }

    /// Store an object directly, bypassing any session.
    ///
    /// # Errors
    /// `-ENOENT` if the pool does not exist.
    pub fn put_object(
        &self,
        pool: &str,
        locator: Option<&str>,
        oid: &str,
        data: &[u8],
    ) -> Result<(), c_int> {
        match self
            .state
            .lock()
            .store
            .write_full(pool, ObjectKey::new(locator, oid), data)
        {
            0 => Ok(()),
            ret => Err(ret),
        }
    }

    #[must_use]
    pub fn object(&self, pool: &str, locator: Option<&str>, oid: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .store
            .get(pool, &ObjectKey::new(locator, oid))
            .map(|object| object.data.clone())
    }

    /// Make the next call of kind `op` fail with `code`.
    pub fn fail_next(&self, op: MockOp, code: c_int) {
        self.state.lock().failures.insert(op, code);
    }

    /// Keep pending every asynchronous operation that has not completed yet,
    /// including ones issued before this call, until
    /// [`MockRados::release_completions`].
    pub fn hold_completions(&self) {
        self.gate.send_replace(true);
    }

    /// Let held asynchronous operations complete.
    pub fn release_completions(&self) {
        self.gate.send_replace(false);
    }

    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn live_clusters(&self) -> usize {
        self.state.lock().clusters.len()
    }

    #[must_use]
    pub fn live_ioctxs(&self) -> usize {
        self.state.lock().ioctxs.len()
    }

    #[must_use]
    pub fn live_completions(&self) -> usize {
        self.state.lock().completions.len()
    }

    /// Configuration option loaded by any live cluster.
    #[must_use]
    pub fn conf_value(&self, key: &str) -> Option<String> {
        self.state
            .lock()
            .clusters
            .values()
            .find_map(|cluster| cluster.options.get(key).cloned())
    }

    /// Services registered so far as `(service, daemon)`.
    #[must_use]
    pub fn services(&self) -> Vec<(String, String)> {
        self.state.lock().services.clone()
    }

    fn record(&self, event: MockEvent) {
        trace!(event = ?event, "mock event");
        self.events.lock().push(event);
    }

    fn completion(&self, completion: CompletionRef) -> Option<Arc<MockCompletion>> {
        self.state.lock().completions.get(&completion).cloned()
    }

    /// Validate an asynchronous request and hand `work` to a worker.
    ///
    /// The address is resolved now, so the locator key in effect at issue
    /// time is the one used.
    fn issue<F>(&self, io: IoCtxRef, oid: &str, completion: CompletionRef, work: F) -> c_int
    where
        F: FnOnce(&ObjectStore, &str, &ObjectKey) -> c_int + Send + 'static,
    {
        let (pool, key, mock_completion) = {
            let mut state = self.state.lock();
            if let Err(code) = state.take_failure(MockOp::AioIssue) {
                return code;
            }
            let (pool, key) = match state.address(io, oid) {
                Ok(address) => address,
                Err(code) => return code,
            };
            let Some(mock_completion) = state.completions.get(&completion).cloned() else {
                return -EINVAL;
            };
            (pool, key, mock_completion)
        };

        let state = Arc::clone(&self.state);
        let mut gate = self.gate.subscribe();
        let delay = self.config.completion_delay;
        self.workers.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if gate.wait_for(|held| !*held).await.is_err() {
                // Mock dropped while held; nobody is left to observe the result.
                return;
            }
            let ret = {
                let state = state.lock();
                work(&state.store, &pool, &key)
            };
            trace!(ret = ret, "mock aio complete");
            mock_completion.finish(ret);
        });
        0
    }
}

impl RadosRuntime for MockRados {
    fn version(&self) -> (c_int, c_int, c_int) {
        self.config.version
    }

    fn create(&self, id: Option<&str>) -> Result<ClusterRef, c_int> {
        let cluster = {
            let mut state = self.state.lock();
            state.take_failure(MockOp::Create)?;
            let cluster = ClusterRef::from_raw(state.next_id());
            state.clusters.insert(
                cluster,
                ClusterEntry {
                    connected: false,
                    options: HashMap::new(),
                },
            );
            cluster
        };
        debug!(cluster = ?cluster, id = ?id, "mock cluster created");
        self.record(MockEvent::ClusterCreated(cluster));
        Ok(cluster)
    }

    fn conf_read_file(&self, cluster: ClusterRef, path: Option<&str>) -> c_int {
        if let Err(code) = self.state.lock().take_failure(MockOp::ConfReadFile) {
            return code;
        }
        // Without a path the default locations are searched; the mock has none.
        let Some(path) = path else {
            return 0;
        };
        let options = match read_conf_file(Path::new(path)) {
            Ok(options) => options,
            Err(code) => return code,
        };
        let mut state = self.state.lock();
        let Some(entry) = state.clusters.get_mut(&cluster) else {
            return -EBADF;
        };
        entry.options.extend(options);
        0
    }

    fn connect(&self, cluster: ClusterRef) -> c_int {
        {
            let mut state = self.state.lock();
            if let Err(code) = state.take_failure(MockOp::Connect) {
                return code;
            }
            let Some(entry) = state.clusters.get_mut(&cluster) else {
                return -EBADF;
            };
            if entry.connected {
                return -EISCONN;
            }
            entry.connected = true;
        }
        self.record(MockEvent::Connected(cluster));
        0
    }

    fn shutdown(&self, cluster: ClusterRef) {
        {
            let mut state = self.state.lock();
            if state.clusters.remove(&cluster).is_none() {
                warn!(cluster = ?cluster, "shutdown of unknown cluster");
                return;
            }
            // The client takes its sessions down with it.
            state.ioctxs.retain(|_, entry| entry.cluster != cluster);
        }
        self.record(MockEvent::Shutdown(cluster));
    }

    fn discard(&self, cluster: ClusterRef) {
        if self.state.lock().clusters.remove(&cluster).is_none() {
            warn!(cluster = ?cluster, "discard of unknown cluster");
            return;
        }
        self.record(MockEvent::Discarded(cluster));
    }

    fn service_register(
        &self,
        cluster: ClusterRef,
        service: &str,
        daemon: &str,
        _metadata: &str,
    ) -> c_int {
        let mut state = self.state.lock();
        if let Err(code) = state.take_failure(MockOp::ServiceRegister) {
            return code;
        }
        if !state.clusters.get(&cluster).is_some_and(|c| c.connected) {
            return -ENOTCONN;
        }
        state.services.push((service.to_string(), daemon.to_string()));
        0
    }

    fn ioctx_create(&self, cluster: ClusterRef, pool: &str) -> Result<IoCtxRef, c_int> {
        let io = {
            let mut state = self.state.lock();
            state.take_failure(MockOp::IoCtxCreate)?;
            if !state.clusters.get(&cluster).is_some_and(|c| c.connected) {
                return Err(-ENOTCONN);
            }
            if !state.store.has_pool(pool) {
                return Err(-ENOENT);
            }
            let io = IoCtxRef::from_raw(state.next_id());
            state.ioctxs.insert(
                io,
                IoCtxEntry {
                    cluster,
                    pool: pool.to_string(),
                    locator: None,
                },
            );
            io
        };
        self.record(MockEvent::IoCtxCreated(io));
        Ok(io)
    }

    fn ioctx_destroy(&self, io: IoCtxRef) {
        if self.state.lock().ioctxs.remove(&io).is_none() {
            warn!(io = ?io, "destroy of unknown ioctx");
            return;
        }
        self.record(MockEvent::IoCtxDestroyed(io));
    }

    fn locator_set_key(&self, io: IoCtxRef, key: Option<&str>) {
        if let Some(entry) = self.state.lock().ioctxs.get_mut(&io) {
            entry.locator = key.map(str::to_string);
        }
    }

    fn stat(&self, io: IoCtxRef, oid: &str) -> Result<StatResult, c_int> {
        let state = self.state.lock();
        let (pool, key) = state.address(io, oid)?;
        state.store.stat(&pool, &key)
    }

    fn read(&self, io: IoCtxRef, oid: &str, buffer: &mut [u8], offset: u64) -> c_int {
        let state = self.state.lock();
        match state.address(io, oid) {
            Ok((pool, key)) => state.store.read(&pool, &key, buffer, offset),
            Err(code) => code,
        }
    }

    fn write_full(&self, io: IoCtxRef, oid: &str, data: &[u8]) -> c_int {
        let mut state = self.state.lock();
        match state.address(io, oid) {
            Ok((pool, key)) => state.store.write_full(&pool, key, data),
            Err(code) => code,
        }
    }

    fn remove(&self, io: IoCtxRef, oid: &str) -> c_int {
        let mut state = self.state.lock();
        match state.address(io, oid) {
            Ok((pool, key)) => state.store.remove(&pool, &key),
            Err(code) => code,
        }
    }

    fn aio_create_completion(&self) -> Result<CompletionRef, c_int> {
        let completion = {
            let mut state = self.state.lock();
            state.take_failure(MockOp::AioCreateCompletion)?;
            let completion = CompletionRef::from_raw(state.next_id());
            state
                .completions
                .insert(completion, Arc::new(MockCompletion::new()));
            completion
        };
        self.record(MockEvent::CompletionCreated(completion));
        Ok(completion)
    }

    fn aio_stat(
        &self,
        io: IoCtxRef,
        oid: &str,
        completion: CompletionRef,
        target: StatTarget,
    ) -> c_int {
        self.issue(io, oid, completion, move |store, pool, key| {
            match store.stat(pool, key) {
                Ok(result) => {
                    *target.lock() = result;
                    0
                }
                Err(code) => code,
            }
        })
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
        if target.lock().capacity() < len {
            return -EINVAL;
        }
        self.issue(io, oid, completion, move |store, pool, key| {
            let mut cell = target.lock();
            // Empty once the completion side has freed it; nothing to fill.
            let buffer = cell.as_mut_slice();
            let len = len.min(buffer.len());
            store.read(pool, key, &mut buffer[..len], offset)
        })
    }

    fn aio_is_complete(&self, completion: CompletionRef) -> bool {
        self.completion(completion)
            .is_some_and(|completion| completion.is_complete())
    }

    fn aio_wait_for_complete(&self, completion: CompletionRef) -> c_int {
        match self.completion(completion) {
            Some(completion) => {
                completion.wait();
                0
            }
            None => -EINVAL,
        }
    }

    fn aio_get_return_value(&self, completion: CompletionRef) -> c_int {
        match self.completion(completion) {
            Some(completion) => completion.return_value(),
            None => -EINVAL,
        }
    }

    fn aio_release(&self, completion: CompletionRef) {
        if self.state.lock().completions.remove(&completion).is_none() {
            warn!(completion = ?completion, "release of unknown completion");
            return;
        }
        self.record(MockEvent::CompletionReleased(completion));
    }
}
