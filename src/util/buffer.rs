//! Aligned buffers for direct IO
//!
//! Devices opened with O_DIRECT reject user buffers that do not start on a
//! block boundary. `AlignedBuffer` over-allocates by the alignment and exposes
//! an aligned window, so the guarantee holds regardless of what the global
//! allocator hands back.

/// Memory-aligned buffer suitable for O_DIRECT operations
///
/// The backing storage is `size + alignment` bytes; the usable window is
/// exactly `size` bytes and starts at an address that is a multiple of
/// `alignment`.
pub struct AlignedBuffer {
    storage: Box<[u8]>,
    offset: usize,
    size: usize,
    alignment: usize,
}

impl AlignedBuffer {
    /// Create a new aligned buffer with the specified size and alignment
    ///
    /// # Arguments
    /// * `size` - Usable size of the buffer in bytes
    /// * `alignment` - Alignment requirement (typically 512 or 4096)
    ///
    /// # Panics
    /// Panics if alignment is not a power of 2 or size is 0
    pub fn new(size: usize, alignment: usize) -> Self {
        assert!(alignment.is_power_of_two(), "Alignment must be a power of 2");
        assert!(size > 0, "Buffer size must be greater than 0");

        let storage = vec![0u8; size + alignment].into_boxed_slice();
        let remainder = storage.as_ptr() as usize & (alignment - 1);
        let offset = if remainder == 0 { 0 } else { alignment - remainder };

        AlignedBuffer {
            storage,
            offset,
            size,
            alignment,
        }
    }

    /// Get a raw pointer to the start of the aligned window
    #[inline(always)]
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    /// Get the aligned window as a slice
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.size]
    }

    /// Get the aligned window as a mutable slice
    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..self.offset + self.size]
    }

    /// Get the usable size of the buffer in bytes
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the alignment of the buffer
    #[inline(always)]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Verify that the buffer is properly aligned
    #[inline(always)]
    pub fn is_aligned(&self) -> bool {
        (self.as_ptr() as usize) % self.alignment == 0
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .field("offset", &self.offset)
            .finish()
    }
}

/// A pooled block: an aligned buffer plus the number of valid bytes in it
///
/// `len` is 0 while the buffer sits in the pool. The producer sets it after
/// filling, the consumer writes `filled()` and hands the block back.
#[derive(Debug)]
pub struct Buffer {
    data: AlignedBuffer,
    len: usize,
}

impl Buffer {
    /// Allocate an empty block of `size` usable bytes
    pub fn new(size: usize, alignment: usize) -> Self {
        Self {
            data: AlignedBuffer::new(size, alignment),
            len: 0,
        }
    }

    /// Number of valid bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Capacity of the block
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.size()
    }

    /// Mark the first `len` bytes as valid
    ///
    /// # Panics
    /// Panics if `len` exceeds the capacity
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.capacity(), "len {} exceeds capacity {}", len, self.capacity());
        self.len = len;
    }

    /// Forget the contents
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// The valid bytes
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.data.as_slice()[..self.len]
    }

    /// The whole block, for filling
    #[inline]
    pub fn spare_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    /// The underlying aligned storage
    #[inline]
    pub fn aligned(&self) -> &AlignedBuffer {
        &self.data
    }
}
