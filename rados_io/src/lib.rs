//! Handle layer over a distributed object store client.
//!
//! [`Rados`] creates [`Cluster`] handles; a connected cluster opens
//! [`IoCtx`] sessions on a pool; sessions issue synchronous reads and stats,
//! or asynchronous ones that return a [`Completion`]. Handles may be dropped
//! in any order: a session keeps its cluster alive through the keep-alive
//! registry, and every native resource is released exactly once.
//!
//! ```
//! use std::sync::Arc;
//!
//! use rados_io::Rados;
//! use rados_runtime_mocked::MockRados;
//!
//! let mock = Arc::new(MockRados::new().unwrap());
//! mock.create_pool("data");
//!
//! let rados = Rados::new(mock);
//! let cluster = rados.create(None).unwrap();
//! cluster.connect().unwrap();
//!
//! let io = cluster.open_ioctx("data").unwrap();
//! io.write_full(None, "greeting", b"hello").unwrap();
//! assert_eq!(io.read(None, "greeting", 100, 0).unwrap(), b"hello");
//!
//! let completion = io.aio_read(None, "greeting", 5, 0).unwrap();
//! completion.wait_for_complete().unwrap();
//! let bytes = completion.get_return_value().unwrap().into_bytes();
//! assert_eq!(bytes.as_deref(), Some(&b"hello"[..]));
//! ```

mod cluster;
mod completion;
mod counter;
mod error;
mod idgen;
mod ioctx;
mod keepalive;
mod rados;

pub use cluster::{Cluster, ClusterStatus};
pub use completion::{AioKind, AioValue, Completion};
pub use counter::active_completions;
pub use error::{NativeError, RadosError, Result, UsageError};
pub use idgen::SessionId;
pub use ioctx::IoCtx;
pub use keepalive::{is_linked, linked_sessions};
pub use rados::Rados;
pub use rados_runtime::{BufferCell, StatResult};
