use std::os::raw::c_int;

use crate::errno::{errno_to_error_kind, strerror, ENOMEM};

/// A failed native call: the raw negative return code and its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    code: c_int,
    message: String,
}

impl NativeError {
    /// Build from a negative native return code.
    #[must_use]
    pub fn from_code(code: c_int) -> Self {
        Self {
            code,
            message: strerror(code.saturating_neg()),
        }
    }

    /// The allocation failure reported before any native call is made.
    #[must_use]
    pub fn out_of_memory() -> Self {
        Self::from_code(-ENOMEM)
    }

    /// Raw native return code (negative).
    #[must_use]
    pub fn code(&self) -> c_int {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn kind(&self) -> embedded_io::ErrorKind {
        errno_to_error_kind(self.code.saturating_neg())
    }
}

impl std::fmt::Display for NativeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for NativeError {}

/// Turn a native return value into a `Result`: negative is an error,
/// anything else is passed through.
///
/// # Errors
/// Returns `NativeError` when `ret` is negative.
pub fn check(ret: c_int) -> Result<c_int, NativeError> {
    if ret < 0 {
        Err(NativeError::from_code(ret))
    } else {
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::ENOENT;

    #[test]
    fn test_check_passes_non_negative() {
        assert_eq!(check(0), Ok(0));
        assert_eq!(check(17), Ok(17));
    }

    #[test]
    fn test_check_converts_negative() {
        let err = check(-ENOENT).unwrap_err();
        assert_eq!(err.code(), -2);
        assert_eq!(err.message(), "No such file or directory");
        assert_eq!(err.kind(), embedded_io::ErrorKind::NotFound);
        assert_eq!(err.to_string(), "No such file or directory (-2)");
    }

    #[test]
    fn test_out_of_memory() {
        let err = NativeError::out_of_memory();
        assert_eq!(err.code(), -12);
        assert_eq!(err.kind(), embedded_io::ErrorKind::OutOfMemory);
    }
}
