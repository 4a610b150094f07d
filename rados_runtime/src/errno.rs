//! Errno values returned by librados and their descriptions.
//!
//! Native calls report failures as `-errno`. The helpers here take the
//! positive errno.

use core::ffi::c_int;

pub const EPERM: c_int = 1;
pub const ENOENT: c_int = 2;
pub const EIO: c_int = 5;
pub const EBADF: c_int = 9;
pub const EAGAIN: c_int = 11;
pub const ENOMEM: c_int = 12;
pub const EACCES: c_int = 13;
pub const EBUSY: c_int = 16;
pub const EEXIST: c_int = 17;
pub const EINVAL: c_int = 22;
pub const ENOSPC: c_int = 28;
pub const ERANGE: c_int = 34;
pub const EISCONN: c_int = 106;
pub const ENOTCONN: c_int = 107;
pub const ESHUTDOWN: c_int = 108;
pub const ETIMEDOUT: c_int = 110;
pub const ECONNREFUSED: c_int = 111;

/// Convert errno to `embedded_io::ErrorKind`
#[must_use]
#[allow(clippy::match_same_arms)] // We explicitly list common errno values for documentation
pub fn errno_to_error_kind(errno: c_int) -> embedded_io::ErrorKind {
    match errno {
        EPERM | EACCES => embedded_io::ErrorKind::PermissionDenied,
        ENOENT => embedded_io::ErrorKind::NotFound,
        EBADF | EINVAL | ERANGE => embedded_io::ErrorKind::InvalidInput,
        ENOMEM | ENOSPC => embedded_io::ErrorKind::OutOfMemory,
        EEXIST | EISCONN => embedded_io::ErrorKind::AlreadyExists,
        ENOTCONN | ESHUTDOWN => embedded_io::ErrorKind::NotConnected,
        ETIMEDOUT => embedded_io::ErrorKind::TimedOut,
        ECONNREFUSED => embedded_io::ErrorKind::ConnectionRefused,
        EIO | EAGAIN | EBUSY => embedded_io::ErrorKind::Other,
        _ => embedded_io::ErrorKind::Other,
    }
}

/// strerror-style description of an errno.
#[must_use]
pub fn strerror(errno: c_int) -> String {
    let known = match errno {
        EPERM => "Operation not permitted",
        ENOENT => "No such file or directory",
        EIO => "Input/output error",
        EBADF => "Bad file descriptor",
        EAGAIN => "Resource temporarily unavailable",
        ENOMEM => "Cannot allocate memory",
        EACCES => "Permission denied",
        EBUSY => "Device or resource busy",
        EEXIST => "File exists",
        EINVAL => "Invalid argument",
        ENOSPC => "No space left on device",
        ERANGE => "Numerical result out of range",
        EISCONN => "Transport endpoint is already connected",
        ENOTCONN => "Transport endpoint is not connected",
        ESHUTDOWN => "Cannot send after transport endpoint shutdown",
        ETIMEDOUT => "Connection timed out",
        ECONNREFUSED => "Connection refused",
        _ => return format!("Unknown error {errno}"),
    };
    known.to_string()
}
