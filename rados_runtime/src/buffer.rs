//! Heap block used as the target of native reads.

use std::fmt;

use tracing::trace;

/// An owned, zero-filled byte block.
///
/// The block is allocated once and never moves, so a raw pointer taken from
/// [`BufferCell::as_mut_ptr`] stays valid until the cell is freed. Freeing is
/// idempotent: the first [`BufferCell::free`] (or the drop) releases the
/// block, later calls do nothing.
///
/// # Example
///
/// ```
/// use rados_runtime::BufferCell;
///
/// let mut cell = BufferCell::alloc(4).unwrap();
/// cell.as_mut_slice()[..2].copy_from_slice(b"hi");
/// assert_eq!(cell.to_vec(2), b"hi");
///
/// cell.free();
/// assert!(cell.is_freed());
/// cell.free();
/// ```
pub struct BufferCell {
    block: Option<Box<[u8]>>,
}

impl BufferCell {
    /// Allocate a block of `len` bytes, or one byte when `len` is zero.
    ///
    /// Returns `None` if the allocator cannot satisfy the request.
    #[must_use]
    pub fn alloc(len: usize) -> Option<Self> {
        let len = len.max(1);
        let mut block = Vec::new();
        block.try_reserve_exact(len).ok()?;
        block.resize(len, 0);
        Some(Self {
            block: Some(block.into_boxed_slice()),
        })
    }

    /// Allocated size in bytes, zero once freed.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.block.as_ref().map_or(0, |b| b.len())
    }

    #[must_use]
    pub fn is_freed(&self) -> bool {
        self.block.is_none()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.block.as_deref().unwrap_or_default()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.block.as_deref_mut().unwrap_or_default()
    }

    /// Start of the block, or null once freed.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.block
            .as_mut()
            .map_or(std::ptr::null_mut(), |b| b.as_mut_ptr())
    }

    /// Copy of the first `len` bytes, clamped to the capacity.
    #[must_use]
    pub fn to_vec(&self, len: usize) -> Vec<u8> {
        let data = self.as_slice();
        data[..len.min(data.len())].to_vec()
    }

    /// Release the block. Freeing an already freed cell is a no-op.
    pub fn free(&mut self) {
        if let Some(block) = self.block.take() {
            trace!(len = block.len(), "buffer freed");
        }
    }
}

impl Drop for BufferCell {
    fn drop(&mut self) {
        self.free();
    }
}

impl fmt::Debug for BufferCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferCell")
            .field("capacity", &self.capacity())
            .finish()
    }
}
