//! Fixed-capacity byte ring used by the frame synchroniser
//!
//! Consuming bytes from the front is O(1); nothing is shifted.

/// Fixed-capacity ring buffer with O(1) advance
///
/// Generic const parameter `N` sets buffer capacity.
pub struct RingBuffer<const N: usize = 4096> {
    data: [u8; N],
    head: usize, // Write position (next empty slot)
    tail: usize, // Read position (first valid byte)
    len: usize,  // Number of bytes available
}

impl<const N: usize> RingBuffer<N> {
    /// Create a new empty ring buffer
    pub const fn new() -> Self {
        Self {
            data: [0u8; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Free space in bytes
    #[inline]
    pub fn free(&self) -> usize {
        N - self.len
    }

    /// Append bytes to the buffer, returns how many were stored
    ///
    /// Bytes that would overflow are not stored; callers make room first.
    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let accepted = bytes.len().min(self.free());
        for &b in &bytes[..accepted] {
            self.data[self.head] = b;
            self.head = (self.head + 1) % N;
        }
        self.len += accepted;
        accepted
    }

    /// Consume n bytes from the front
    #[inline]
    pub fn advance(&mut self, n: usize) {
        let n = n.min(self.len);
        self.tail = (self.tail + n) % N;
        self.len -= n;
    }

    /// Drop everything
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Number of bytes available to read
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are buffered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read byte at logical index (handles wraparound)
    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        if index < self.len {
            Some(self.data[(self.tail + index) % N])
        } else {
            None
        }
    }

    /// Find a byte pattern at or after logical offset `from`
    pub fn find_pattern(&self, pattern: &[u8], from: usize) -> Option<usize> {
        if pattern.is_empty() || self.len < pattern.len() {
            return None;
        }
        (from..=self.len - pattern.len()).find(|&i| {
            pattern
                .iter()
                .enumerate()
                .all(|(k, &p)| self.data[(self.tail + i + k) % N] == p)
        })
    }

    /// Copy `out.len()` bytes starting at logical `start` into `out`
    ///
    /// Returns false (and leaves `out` untouched) if not enough bytes are buffered.
    pub fn copy_out(&self, start: usize, out: &mut [u8]) -> bool {
        if start + out.len() > self.len {
            return false;
        }
        let real_start = (self.tail + start) % N;
        if real_start + out.len() <= N {
            out.copy_from_slice(&self.data[real_start..real_start + out.len()]);
        } else {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = self.data[(real_start + i) % N];
            }
        }
        true
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
