//! Pools and objects of the mocked cluster.

use std::collections::HashMap;
use std::os::raw::c_int;
use std::time::{SystemTime, UNIX_EPOCH};

use rados_runtime::errno::{EIO, ENOENT};
use rados_runtime::StatResult;

/// An object whose name contains this character fails every operation with
/// `-EIO`.
pub const WANT_ERROR: char = '\u{0001}';

/// Objects are addressed by locator and name. Without a locator key the
/// object name is its own locator, so an object written under a key is only
/// found again under the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub locator: String,
    pub oid: String,
}

impl ObjectKey {
    #[must_use]
    pub fn new(locator: Option<&str>, oid: &str) -> Self {
        Self {
            locator: locator.unwrap_or(oid).to_string(),
            oid: oid.to_string(),
        }
    }

    fn want_error(&self) -> bool {
        self.oid.contains(WANT_ERROR)
    }
}

#[derive(Debug, Clone)]
pub struct MockObject {
    pub data: Vec<u8>,
    pub mtime: i64,
}

#[derive(Debug, Default)]
pub struct ObjectStore {
    pools: HashMap<String, HashMap<ObjectKey, MockObject>>,
}

impl ObjectStore {
    /// Returns `false` if the pool already existed.
    pub fn create_pool(&mut self, name: &str) -> bool {
        if self.pools.contains_key(name) {
            return false;
        }
        self.pools.insert(name.to_string(), HashMap::new());
        true
    }

    #[must_use]
    pub fn has_pool(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, pool: &str, key: &ObjectKey) -> Option<&MockObject> {
        self.pools.get(pool)?.get(key)
    }

    /// # Errors
    /// `-ENOENT` for a missing pool or object, `-EIO` for `WANT_ERROR`.
    pub fn stat(&self, pool: &str, key: &ObjectKey) -> Result<StatResult, c_int> {
        if key.want_error() {
            return Err(-EIO);
        }
        let object = self.get(pool, key).ok_or(-ENOENT)?;
        Ok(StatResult {
            size: object.data.len() as u64,
            mtime: object.mtime,
        })
    }

    /// Copy object bytes starting at `offset` into `buffer`. Returns the
    /// number of bytes copied: short at the end of the object, zero past it.
    pub fn read(&self, pool: &str, key: &ObjectKey, buffer: &mut [u8], offset: u64) -> c_int {
        if key.want_error() {
            return -EIO;
        }
        let Some(object) = self.get(pool, key) else {
            return -ENOENT;
        };
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(object.data.len());
        let max_count = usize::try_from(c_int::MAX).unwrap_or(usize::MAX);
        let count = buffer.len().min(object.data.len() - start).min(max_count);
        buffer[..count].copy_from_slice(&object.data[start..start + count]);
        c_int::try_from(count).unwrap_or(c_int::MAX)
    }

    pub fn write_full(&mut self, pool: &str, key: ObjectKey, data: &[u8]) -> c_int {
        if key.want_error() {
            return -EIO;
        }
        let Some(objects) = self.pools.get_mut(pool) else {
            return -ENOENT;
        };
        objects.insert(
            key,
            MockObject {
                data: data.to_vec(),
                mtime: now(),
            },
        );
        0
    }

    pub fn remove(&mut self, pool: &str, key: &ObjectKey) -> c_int {
        if key.want_error() {
            return -EIO;
        }
        match self.pools.get_mut(pool).and_then(|objects| objects.remove(key)) {
            Some(_) => 0,
            None => -ENOENT,
        }
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
