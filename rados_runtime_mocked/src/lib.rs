//! In-memory rados cluster implementing `RadosRuntime`.
//!
//! - `MockRados` holds pools, objects, cluster and session tables.
//! - Asynchronous operations run on a private tokio runtime, the stand-in
//!   for librados worker threads.
//! - `WANT_ERROR` in an object name makes operations on it fail with `-EIO`.
//! - `fail_next` makes the next call of a given kind fail with a chosen code.
//! - `hold_completions` keeps asynchronous operations pending until
//!   `release_completions`.

pub mod completion;
pub mod conf;
pub mod config;
pub mod mock_rados;
pub mod store;

pub use config::MockConfig;
pub use mock_rados::{MockEvent, MockOp, MockRados};
pub use store::WANT_ERROR;
