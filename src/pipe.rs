//! A thread-safe, fixed-capacity pipe connecting a producer and a consumer.
//!
//! [`pipe`] returns two independently-closable handles over one circular
//! byte buffer. One thread writes while another reads; either side
//! blocking releases the lock, and closing either end wakes every waiter
//! on both sides so it can observe the new state instead of hanging.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;

/// Creates a pipe with the given buffer capacity in bytes.
///
/// The reader sees everything the writer wrote, in order. Closing the
/// write end lets the reader drain the buffer and then observe EOF;
/// closing the read end fails subsequent writes with
/// [`Error::PipeClosed`]. Dropping an endpoint closes it.
pub fn pipe(capacity: usize) -> (PipeReader, PipeWriter) {
    assert!(capacity > 0, "pipe capacity must be non-zero");
    let shared = Arc::new(Shared {
        ring: Mutex::new(Ring {
            buf: vec![0u8; capacity].into_boxed_slice(),
            off: 0,
            len: 0,
            read_closed: false,
            write_closed: false,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
    });
    (
        PipeReader {
            shared: Arc::clone(&shared),
        },
        PipeWriter { shared },
    )
}

struct Shared {
    ring: Mutex<Ring>,
    readable: Condvar,
    writable: Condvar,
}

struct Ring {
    buf: Box<[u8]>,
    off: usize,
    len: usize,
    read_closed: bool,
    write_closed: bool,
}

impl Ring {
    fn free(&self) -> usize {
        self.buf.len() - self.len
    }

    // Appends as much of `src` as fits, returning the count copied.
    fn push(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.free());
        let cap = self.buf.len();
        let end = (self.off + self.len) % cap;
        let first = n.min(cap - end);
        self.buf[end..end + first].copy_from_slice(&src[..first]);
        self.buf[..n - first].copy_from_slice(&src[first..n]);
        self.len += n;
        n
    }

    // Removes up to `dst.len()` bytes from the front, returning the count.
    fn pop(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len);
        let cap = self.buf.len();
        let first = n.min(cap - self.off);
        dst[..first].copy_from_slice(&self.buf[self.off..self.off + first]);
        dst[first..n].copy_from_slice(&self.buf[..n - first]);
        self.advance(n);
        n
    }

    fn discard(&mut self, n: usize) -> usize {
        let n = n.min(self.len);
        self.advance(n);
        n
    }

    fn advance(&mut self, n: usize) {
        self.off = (self.off + n) % self.buf.len();
        self.len -= n;
        if self.len == 0 {
            self.off = 0;
        }
    }
}

/// The read end of a [`pipe`].
pub struct PipeReader {
    shared: Arc<Shared>,
}

/// The write end of a [`pipe`].
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Reads into `buf`, blocking until data is available.
    ///
    /// Returns `Ok(0)` (EOF) once the write end is closed and the buffer
    /// is drained; fails with [`Error::PipeClosed`] if this end itself
    /// was closed.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut ring = self.shared.ring.lock();
        loop {
            if ring.read_closed {
                return Err(Error::PipeClosed);
            }
            if ring.len > 0 {
                let n = ring.pop(buf);
                self.shared.writable.notify_all();
                return Ok(n);
            }
            if ring.write_closed {
                return Ok(0);
            }
            self.shared.readable.wait(&mut ring);
        }
    }

    /// Reads a single byte; `Ok(None)` at EOF.
    pub fn read_byte(&self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Discards up to `n` bytes, blocking like [`read`](Self::read).
    /// Returns the number discarded, 0 at EOF.
    pub fn skip(&self, n: usize) -> Result<usize> {
        if n == 0 {
            return Ok(0);
        }
        let mut ring = self.shared.ring.lock();
        loop {
            if ring.read_closed {
                return Err(Error::PipeClosed);
            }
            if ring.len > 0 {
                let discarded = ring.discard(n);
                self.shared.writable.notify_all();
                return Ok(discarded);
            }
            if ring.write_closed {
                return Ok(0);
            }
            self.shared.readable.wait(&mut ring);
        }
    }

    /// Number of bytes currently buffered.
    pub fn available(&self) -> usize {
        self.shared.ring.lock().len
    }

    /// Closes the read end. Idempotent; wakes all blocked threads.
    pub fn close(&self) {
        let mut ring = self.shared.ring.lock();
        if !ring.read_closed {
            ring.read_closed = true;
            self.shared.readable.notify_all();
            self.shared.writable.notify_all();
        }
    }
}

impl PipeWriter {
    /// Writes all of `buf`, blocking whenever the buffer is full.
    ///
    /// Fails with [`Error::PipeClosed`] if either end has been closed;
    /// the check is repeated at every wakeup, so a close while blocked
    /// unblocks this call with the error.
    pub fn write_all(&self, mut buf: &[u8]) -> Result<()> {
        let mut ring = self.shared.ring.lock();
        loop {
            if ring.read_closed || ring.write_closed {
                return Err(Error::PipeClosed);
            }
            let n = ring.push(buf);
            if n > 0 {
                self.shared.readable.notify_all();
                buf = &buf[n..];
            }
            if buf.is_empty() {
                return Ok(());
            }
            self.shared.writable.wait(&mut ring);
        }
    }

    /// Writes a single byte.
    pub fn write_byte(&self, byte: u8) -> Result<()> {
        self.write_all(&[byte])
    }

    /// Closes the write end. Idempotent; wakes all blocked threads, and
    /// the reader drains whatever is buffered before seeing EOF.
    pub fn close(&self) {
        let mut ring = self.shared.ring.lock();
        if !ring.write_closed {
            ring.write_closed = true;
            self.shared.readable.notify_all();
            self.shared.writable.notify_all();
        }
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        PipeReader::read(self, buf).map_err(Into::into)
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PipeWriter::write_all(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
