//! Errors of the handle layer.
//!
//! Two disjoint classes: a [`UsageError`] means the caller misused a handle
//! (wrong state, bad argument) and should abort what it is doing; a
//! [`NativeError`] is an operational failure reported by the storage library.

use std::os::raw::c_int;

pub use rados_runtime::NativeError;

pub(crate) const SHUTDOWN_REUSE: &str = "cannot reuse shutdown rados handle";
pub(crate) const NOT_CONNECTED: &str = "not connected to cluster";
pub(crate) const ALREADY_CONNECTED: &str = "already connected to cluster";
pub(crate) const CLOSED_REUSE: &str = "cannot reuse closed ioctx handle";
pub(crate) const RELEASED_REUSE: &str = "cannot reuse released completion";
pub(crate) const NEGATIVE_LENGTH: &str = "length must not be negative";
pub(crate) const NEGATIVE_OFFSET: &str = "offset must not be negative";

/// Misuse of a handle by the caller.
///
/// `arg` is the 1-based position of the offending argument, the handle
/// itself being argument 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageError {
    arg: usize,
    reason: &'static str,
}

impl UsageError {
    pub(crate) const fn new(arg: usize, reason: &'static str) -> Self {
        Self { arg, reason }
    }

    #[must_use]
    pub fn arg(&self) -> usize {
        self.arg
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad argument #{} ({})", self.arg, self.reason)
    }
}

impl std::error::Error for UsageError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadosError {
    /// The caller misused a handle.
    Usage(UsageError),
    /// The storage library reported a failure.
    Native(NativeError),
    /// Broken internal invariant; never expected.
    Internal(&'static str),
}

impl RadosError {
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    #[must_use]
    pub fn usage(&self) -> Option<&UsageError> {
        match self {
            Self::Usage(e) => Some(e),
            _ => None,
        }
    }

    /// Raw native code, for native errors only.
    #[must_use]
    pub fn native_code(&self) -> Option<c_int> {
        match self {
            Self::Native(e) => Some(e.code()),
            _ => None,
        }
    }
}

impl std::fmt::Display for RadosError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(e) => write!(f, "{e}"),
            Self::Native(e) => write!(f, "{e}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for RadosError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Usage(e) => Some(e),
            Self::Native(e) => Some(e),
            Self::Internal(_) => None,
        }
    }
}

impl From<UsageError> for RadosError {
    fn from(e: UsageError) -> Self {
        Self::Usage(e)
    }
}

impl From<NativeError> for RadosError {
    fn from(e: NativeError) -> Self {
        Self::Native(e)
    }
}

pub type Result<T> = std::result::Result<T, RadosError>;

/// Native return value to `Result`, as a byte count or status.
pub(crate) fn check(ret: c_int) -> Result<usize> {
    let ret = rados_runtime::check(ret)?;
    usize::try_from(ret).map_err(|_| RadosError::Internal("non-negative return out of range"))
}

/// Validate a length or offset given as a signed integer.
pub(crate) fn non_negative(value: i64, arg: usize, reason: &'static str) -> Result<u64> {
    u64::try_from(value).map_err(|_| UsageError::new(arg, reason).into())
}

/// Validate a length and convert it to a buffer size.
pub(crate) fn buffer_len(value: i64, arg: usize) -> Result<usize> {
    let len = non_negative(value, arg, NEGATIVE_LENGTH)?;
    usize::try_from(len).map_err(|_| NativeError::out_of_memory().into())
}
