//! The growable window of unconsumed bytes between the source and the
//! tokenizer.

use std::{io, sync::Arc};

use futures::io::{AsyncRead, AsyncReadExt};

use crate::pool::{BufferPool, PooledBuffer};

/// A rented byte buffer holding the not-yet-consumed part of the stream.
///
/// The live window is `bytes[offset..offset + used]`. Consuming advances the
/// window; filling appends to it from the byte source, compacting or growing
/// the storage first so that at least half of it is free.
#[derive(Debug)]
pub(crate) struct SliceBuffer {
    bytes: PooledBuffer,
    offset: usize,
    used: usize,
    source_exhausted: bool,
}

impl SliceBuffer {
    pub(crate) fn new(pool: &Arc<BufferPool>, size: usize) -> Self {
        Self {
            bytes: pool.rent(size),
            offset: 0,
            used: 0,
            source_exhausted: false,
        }
    }

    /// The unconsumed bytes.
    pub(crate) fn current_segment(&self) -> &[u8] {
        &self.bytes[self.offset..self.offset + self.used]
    }

    pub(crate) fn used_bytes(&self) -> usize {
        self.used
    }

    pub(crate) fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the source has reported end of stream. Once set, the current
    /// segment is the rest of the document.
    pub(crate) fn is_source_exhausted(&self) -> bool {
        self.source_exhausted
    }

    /// Drops `count` bytes from the front of the window.
    pub(crate) fn consume(&mut self, count: usize) {
        debug_assert!(count <= self.used, "consumed past the end of the window");
        if count == 0 {
            return;
        }
        if count >= self.used {
            self.offset = 0;
            self.used = 0;
        } else {
            self.offset += count;
            self.used -= count;
        }
    }

    /// Makes room for a fill: compacts when the window starts in the back
    /// half, otherwise doubles the storage when more than half is in use.
    pub(crate) fn ensure_space(&mut self) {
        let half = self.bytes.len() / 2;
        if self.offset >= half {
            log::trace!("compacting {} unconsumed bytes to the front", self.used);
            self.bytes
                .copy_within(self.offset..self.offset + self.used, 0);
            self.offset = 0;
        } else if self.offset + self.used > half {
            let grown_len = self.bytes.len() * 2;
            let mut grown = self.bytes.pool().rent(grown_len);
            grown[..self.used].copy_from_slice(self.current_segment());
            log::debug!(
                "growing read buffer from {} to {} bytes",
                self.bytes.len(),
                grown.len()
            );
            // The old storage returns to the pool on drop.
            self.bytes = grown;
            self.offset = 0;
        }
    }

    /// Appends bytes from `source` until the storage is full or the source
    /// reports end of stream. Returns the number of bytes appended.
    ///
    /// Interrupted reads are retried. The caller must not fill an exhausted
    /// buffer.
    pub(crate) async fn fill_from<R>(&mut self, source: &mut R) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        debug_assert!(!self.source_exhausted, "filled an exhausted buffer");
        self.ensure_space();

        let mut appended = 0;
        loop {
            let write_at = self.offset + self.used;
            if write_at >= self.bytes.len() {
                break;
            }
            let read = match source.read(&mut self.bytes[write_at..]).await {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if read == 0 {
                log::trace!("byte source exhausted after {appended} more bytes");
                self.source_exhausted = true;
                break;
            }
            self.used += read;
            appended += read;
        }
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, io::Cursor};

    use super::*;
    use crate::chunk_utils::ChunkedReader;

    fn buffer(size: usize) -> SliceBuffer {
        SliceBuffer::new(&Arc::new(BufferPool::new(4)), size)
    }

    #[test]
    fn consume_resets_when_window_is_empty() {
        let mut buf = buffer(16);
        block_on(buf.fill_from(&mut Cursor::new(b"0123456789".to_vec()))).unwrap();
        assert!(buf.is_source_exhausted());
        buf.consume(4);
        assert_eq!(buf.current_segment(), b"456789");
        buf.consume(6);
        assert_eq!(buf.used_bytes(), 0);
        assert_eq!(buf.offset, 0);
    }

    #[test]
    fn fill_stops_when_storage_is_full() {
        let mut buf = buffer(16);
        let mut source = Cursor::new(vec![b'x'; 40]);
        let appended = block_on(buf.fill_from(&mut source)).unwrap();
        assert_eq!(appended, 16);
        assert!(!buf.is_source_exhausted());
    }

    #[test]
    fn fill_compacts_when_offset_passes_half() {
        let mut buf = buffer(16);
        let mut source = Cursor::new((0..40u8).collect::<Vec<_>>());
        block_on(buf.fill_from(&mut source)).unwrap();
        buf.consume(10);
        block_on(buf.fill_from(&mut source)).unwrap();
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.offset, 0);
        assert_eq!(buf.current_segment(), (10..26u8).collect::<Vec<_>>());
    }

    #[test]
    fn fill_grows_when_more_than_half_is_used() {
        let mut buf = buffer(16);
        let mut source = Cursor::new((0..40u8).collect::<Vec<_>>());
        block_on(buf.fill_from(&mut source)).unwrap();
        buf.consume(2);
        block_on(buf.fill_from(&mut source)).unwrap();
        assert_eq!(buf.capacity(), 32);
        assert_eq!(buf.current_segment(), (2..34u8).collect::<Vec<_>>());
    }

    #[test]
    fn fill_accumulates_short_reads() {
        let mut buf = buffer(16);
        let mut source = ChunkedReader::new(b"abcdefgh".to_vec(), 3);
        let appended = block_on(buf.fill_from(&mut source)).unwrap();
        assert_eq!(appended, 8);
        assert!(buf.is_source_exhausted());
        assert_eq!(buf.current_segment(), b"abcdefgh");
    }

    #[test]
    fn old_storage_returns_to_pool_after_growth() {
        let pool = Arc::new(BufferPool::new(4));
        let mut buf = SliceBuffer::new(&pool, 16);
        let mut source = Cursor::new(vec![b'x'; 64]);
        block_on(buf.fill_from(&mut source)).unwrap();
        block_on(buf.fill_from(&mut source)).unwrap();
        assert_eq!(pool.retained(), 1);
        drop(buf);
        assert_eq!(pool.retained(), 2);
    }
}
