//! Helpers for feeding documents to a reader in pieces.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use futures::io::AsyncRead;

/// Split `payload` into approximately equal-sized chunks.
///
/// # Panics
///
/// Panics if `parts` is zero.
#[must_use]
pub fn produce_chunks(payload: &[u8], parts: usize) -> Vec<&[u8]> {
    assert!(parts > 0);
    let chunk_size = payload.len().div_ceil(parts).max(1);
    payload.chunks(chunk_size).collect()
}

/// An in-memory byte source that hands out at most `chunk_size` bytes per
/// read, optionally failing every other read with
/// [`io::ErrorKind::Interrupted`] or stalling forever at a given offset.
#[derive(Debug, Clone)]
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
    interrupting: bool,
    interrupt_next: bool,
    stall_at: Option<usize>,
}

impl ChunkedReader {
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        assert!(chunk_size > 0);
        Self {
            data: data.into(),
            pos: 0,
            chunk_size,
            interrupting: false,
            interrupt_next: false,
            stall_at: None,
        }
    }

    /// Fail the read after each successful one with `Interrupted`.
    #[must_use]
    pub fn with_interruptions(mut self) -> Self {
        self.interrupting = true;
        self
    }

    /// Return `Poll::Pending` forever once `offset` bytes were served.
    #[must_use]
    pub fn stall_at(mut self, offset: usize) -> Self {
        self.stall_at = Some(offset);
        self
    }

    /// Bytes handed out so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        if this.interrupt_next {
            this.interrupt_next = false;
            return Poll::Ready(Err(io::ErrorKind::Interrupted.into()));
        }
        let mut end = this.data.len();
        if let Some(stall_at) = this.stall_at {
            if this.pos >= stall_at {
                return Poll::Pending;
            }
            end = end.min(stall_at);
        }
        let count = (end - this.pos).min(this.chunk_size).min(buf.len());
        buf[..count].copy_from_slice(&this.data[this.pos..this.pos + count]);
        this.pos += count;
        this.interrupt_next = this.interrupting && count > 0;
        Poll::Ready(Ok(count))
    }
}

#[cfg(test)]
mod tests {
    use futures::{executor::block_on, io::AsyncReadExt};

    use super::*;

    #[test]
    fn chunks_cover_payload() {
        let chunks = produce_chunks(b"abcdefg", 3);
        assert_eq!(chunks, [&b"abc"[..], b"def", b"g"]);
        assert!(produce_chunks(b"", 3).is_empty());
    }

    #[test]
    fn reader_serves_bounded_chunks() {
        let mut reader = ChunkedReader::new(b"abcdefg".to_vec(), 3);
        let mut buf = [0; 8];
        assert_eq!(block_on(reader.read(&mut buf)).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        let mut rest = Vec::new();
        block_on(reader.read_to_end(&mut rest)).unwrap();
        assert_eq!(rest, b"defg");
    }

    #[test]
    fn reader_interrupts_between_reads() {
        let mut reader = ChunkedReader::new(b"abcd".to_vec(), 2).with_interruptions();
        let mut buf = [0; 8];
        assert_eq!(block_on(reader.read(&mut buf)).unwrap(), 2);
        let err = block_on(reader.read(&mut buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert_eq!(block_on(reader.read(&mut buf)).unwrap(), 2);
    }
}
