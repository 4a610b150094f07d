//! Native boundary of the rados handle layer.
//!
//! The storage client library is reached only through [`RadosRuntime`].
//! Backends return `c_int` status codes in the librados convention:
//! zero or positive is success, negative is `-errno`.

pub mod buffer;
pub mod errno;
pub mod error;
pub mod handles;
pub mod runtime_trait;

#[cfg(feature = "librados")]
mod librados;
#[cfg(feature = "librados")]
pub mod ffi_runtime;

pub use buffer::BufferCell;
pub use error::{check, NativeError};
pub use handles::{
    read_target, stat_target, ClusterRef, CompletionRef, IoCtxRef, ReadTarget, StatResult,
    StatTarget,
};
pub use runtime_trait::RadosRuntime;

#[cfg(feature = "librados")]
pub use ffi_runtime::FfiRadosRuntime;
