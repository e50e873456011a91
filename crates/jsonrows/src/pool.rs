//! A shared pool of byte buffers.
//!
//! Buffers are bucketed by power-of-two length, from 16 bytes up to 1 GiB.
//! Renting hands out a [`PooledBuffer`] that owns its bytes exclusively and
//! returns them to the bucket they came from when dropped, so the release
//! happens on every exit path of the owner (success, error, or a cancelled
//! future being dropped). Requests larger than the biggest bucket are served
//! with a plain allocation that is freed instead of pooled.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crossbeam_queue::ArrayQueue;
use once_cell::sync::Lazy;

const MIN_BUCKET_SHIFT: u32 = 4;
const BUCKET_COUNT: usize = 27;
const DEFAULT_MAX_PER_BUCKET: usize = 32;

static SHARED: Lazy<Arc<BufferPool>> =
    Lazy::new(|| Arc::new(BufferPool::new(DEFAULT_MAX_PER_BUCKET)));

/// A thread-safe pool of reusable byte buffers.
///
/// Each bucket retains at most `max_per_bucket` idle buffers; extra buffers
/// returned to a full bucket are dropped.
#[derive(Debug)]
pub struct BufferPool {
    buckets: Vec<ArrayQueue<Vec<u8>>>,
}

impl BufferPool {
    /// Creates a pool retaining up to `max_per_bucket` idle buffers per size
    /// class.
    #[must_use]
    pub fn new(max_per_bucket: usize) -> Self {
        let max_per_bucket = max_per_bucket.max(1);
        Self {
            buckets: (0..BUCKET_COUNT)
                .map(|_| ArrayQueue::new(max_per_bucket))
                .collect(),
        }
    }

    /// Returns the process-wide pool used when no pool is supplied.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Rents a buffer of at least `min_len` bytes.
    ///
    /// The returned length is `min_len` rounded up to the bucket size. The
    /// contents are unspecified.
    #[must_use]
    pub fn rent(self: &Arc<Self>, min_len: usize) -> PooledBuffer {
        let len = bucket_len(min_len);
        let bytes = match bucket_index(len) {
            Some(index) => self.buckets[index].pop().unwrap_or_else(|| {
                log::debug!("buffer pool miss for {len} bytes, allocating");
                vec![0; len]
            }),
            None => vec![0; len],
        };
        PooledBuffer {
            bytes,
            pool: Arc::clone(self),
        }
    }

    /// Number of idle buffers currently retained across all buckets.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.buckets.iter().map(ArrayQueue::len).sum()
    }

    fn give_back(&self, bytes: Vec<u8>) {
        if let Some(index) = bucket_index(bytes.len()) {
            // A full bucket drops the buffer.
            let _ = self.buckets[index].push(bytes);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_BUCKET)
    }
}

/// Rounds `min_len` up to the size class that serves it.
fn bucket_len(min_len: usize) -> usize {
    let min_len = min_len.max(1 << MIN_BUCKET_SHIFT);
    min_len.checked_next_power_of_two().unwrap_or(min_len)
}

fn bucket_index(len: usize) -> Option<usize> {
    if !len.is_power_of_two() {
        return None;
    }
    let index = len.trailing_zeros().checked_sub(MIN_BUCKET_SHIFT)? as usize;
    (index < BUCKET_COUNT).then_some(index)
}

/// A byte buffer on loan from a [`BufferPool`].
///
/// Dropping it returns the bytes to the pool; they are never touched through
/// this handle again.
pub struct PooledBuffer {
    bytes: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// The pool this buffer is returned to.
    #[must_use]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let bytes = core::mem::take(&mut self.bytes);
        self.pool.give_back(bytes);
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
