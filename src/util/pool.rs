//! Fixed-size pool of aligned blocks
//!
//! The pool is a bounded channel pre-loaded with `count` blocks. Taking a
//! block out of the channel is the only way to get one, so the channel acts as
//! a semaphore: a producer can never run more than `count` blocks ahead of the
//! consumer that returns them, and memory stays bounded at
//! `count * (block_size + alignment)`.

use super::buffer::Buffer;
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::Mutex;

/// Pre-allocated pool of aligned blocks circulated between pipeline stages
///
/// All methods take `&self`; one pool is shared by the producer (which
/// acquires) and the consumer (which releases and, on shutdown, closes).
pub struct BufferPool {
    free: Receiver<Buffer>,
    /// Return path. `None` once closed, which disconnects `free`.
    returns: Mutex<Option<Sender<Buffer>>>,
    capacity: usize,
    block_size: usize,
    alignment: usize,
}

impl BufferPool {
    /// Create a new buffer pool with the specified parameters
    ///
    /// # Arguments
    /// * `count` - Number of blocks to pre-allocate
    /// * `block_size` - Size of each block in bytes
    /// * `alignment` - Alignment requirement (typically 512 or 4096)
    ///
    /// # Panics
    /// Panics if `count` is 0, or on invalid block size / alignment
    pub fn new(count: usize, block_size: usize, alignment: usize) -> Self {
        assert!(count > 0, "Pool must hold at least one buffer");

        let (tx, rx) = channel::bounded(count);
        for _ in 0..count {
            // Cannot fail: the channel has room for exactly `count` blocks
            // and we still own the receiver.
            let _ = tx.send(Buffer::new(block_size, alignment));
        }

        BufferPool {
            free: rx,
            returns: Mutex::new(Some(tx)),
            capacity: count,
            block_size,
            alignment,
        }
    }

    /// Take a free block, waiting for one to be released if necessary
    ///
    /// Returns `None` once the pool has been closed and no free blocks remain.
    pub fn acquire(&self) -> Option<Buffer> {
        self.free.recv().ok()
    }

    /// Hand a block back to the pool
    ///
    /// The block's length is reset. After `close()` the block is dropped.
    pub fn release(&self, mut buffer: Buffer) {
        buffer.clear();
        let returns = self.returns.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = returns.as_ref() {
            // The pool keeps its own receiver alive, so this never disconnects;
            // the channel is sized for every block so it never blocks either.
            let _ = tx.send(buffer);
        }
    }

    /// Stop circulating blocks
    ///
    /// Idempotent. Pending and future `acquire` calls drain whatever is still
    /// free and then return `None`.
    pub fn close(&self) {
        self.returns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.returns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Get the number of blocks currently free
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Get the total number of blocks the pool was built with
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the size of each block
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Get the alignment of blocks in the pool
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }
}
