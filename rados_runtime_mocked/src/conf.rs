//! Ceph-style configuration files.
//!
//! ```text
//! [global]
//! mon host = 10.0.0.1
//! # comment
//! ; comment
//! keyring = /etc/ceph/keyring
//! ```
//!
//! Spaces and dashes in keys are normalized to underscores, so `mon host`,
//! `mon-host` and `mon_host` are the same option. Section headers are
//! accepted but not tracked.

use std::collections::HashMap;
use std::os::raw::c_int;
use std::path::Path;

use rados_runtime::errno::{EACCES, EINVAL, EIO, ENOENT};

/// Parse configuration text.
///
/// # Errors
/// `-EINVAL` for a line that is neither a section, a comment nor `key = value`.
pub fn parse_conf(text: &str) -> Result<HashMap<String, String>, c_int> {
    let mut options = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(-EINVAL);
            }
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(-EINVAL);
        };
        let key = normalize_key(key);
        if key.is_empty() {
            return Err(-EINVAL);
        }
        options.insert(key, value.trim().to_string());
    }
    Ok(options)
}

/// Read and parse a configuration file.
///
/// # Errors
/// `-ENOENT` if the file does not exist, `-EACCES` if it cannot be read,
/// `-EINVAL` if it is malformed, `-EIO` otherwise.
pub fn read_conf_file(path: &Path) -> Result<HashMap<String, String>, c_int> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => -ENOENT,
        std::io::ErrorKind::PermissionDenied => -EACCES,
        std::io::ErrorKind::InvalidData => -EINVAL,
        _ => -EIO,
    })?;
    parse_conf(&text)
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
