//! A never-blocking buffered writer backed by a background worker thread.
//!
//! [`AsyncWriter`] wraps any `Write + Send` sink. Callers only ever
//! append to an internal buffer and return immediately; one lazily
//! started worker thread drains the buffer to the sink, honors flush
//! checkpoints, and performs the final close. The first sink error
//! permanently poisons the instance: every subsequent operation surfaces
//! that same original error, and the sink is never touched again.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Fresh buffers start small; the worker lets a buffer grow with bursts
// and shrinks it back once it is mostly empty and past this threshold.
const INITIAL_BUFFER: usize = 8 * 1024;
const SHRINK_THRESHOLD: usize = 64 * 1024;

/// A buffered writer whose `write`/`flush`/`close` never block.
///
/// Data is appended to an internal buffer under a mutex and written to
/// the downstream sink by a dedicated worker thread, which is the only
/// thread that ever calls into the sink. Writes from a single caller
/// reach the sink in order; concurrent callers' appends serialize at the
/// buffer, with no cross-caller ordering beyond that.
///
/// A flush records a checkpoint covering everything buffered at the call
/// point; a later flush supersedes an earlier pending one (all of the
/// earlier checkpoint's data is covered by the later one anyway). The
/// checkpoint is satisfied once that data has been written and the sink
/// flushed.
///
/// Failure is terminal: there are no retries, and a poisoned instance
/// can only be discarded. Buffer overflow on a [`bounded`](Self::bounded)
/// writer is a synchronous, caller-recoverable condition, independent of
/// worker errors.
pub struct AsyncWriter<W: Write + Send + 'static> {
    inner: Arc<Inner<W>>,
}

struct Inner<W> {
    state: Mutex<State>,
    /// Signals the worker that there is data, a flush, or a close to handle.
    work: Condvar,
    /// Signals callers waiting for buffer space or for idle.
    idle: Condvar,
    /// The sink, handed to the worker when it starts.
    sink: Mutex<Option<W>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Worker {
    Absent,
    Running,
    Exited,
}

struct State {
    buf: Vec<u8>,
    /// `Some(capacity)` for a bounded buffer, `None` for auto-grow.
    limit: Option<usize>,
    flush_mark: Option<usize>,
    closed: bool,
    error: Option<Arc<io::Error>>,
    worker: Worker,
}

impl State {
    fn check_open(&self) -> Result<()> {
        if let Some(err) = self.poisoned() {
            return Err(err);
        }
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn poisoned(&self) -> Option<Error> {
        self.error
            .as_ref()
            .map(|e| Error::WriterPoisoned(Arc::clone(e)))
    }

    fn free_space(&self) -> usize {
        match self.limit {
            None => usize::MAX,
            Some(limit) => limit.saturating_sub(self.buf.len()),
        }
    }

    fn is_idle(&self) -> bool {
        self.buf.is_empty()
            && self.flush_mark.is_none()
            && (!self.closed || self.worker == Worker::Exited)
    }

    // First error wins; later ones are logged and discarded.
    fn fail(&mut self, err: io::Error) {
        if self.error.is_none() {
            log::warn!("async writer poisoned: {err}");
            self.error = Some(Arc::new(err));
        } else {
            log::debug!("discarding subsequent worker error: {err}");
        }
        self.buf = Vec::new();
        self.flush_mark = None;
        self.worker = Worker::Exited;
    }

    fn shrink_if_oversized(&mut self) {
        if self.buf.capacity() > SHRINK_THRESHOLD && self.buf.len() <= self.buf.capacity() / 4 {
            self.buf.shrink_to(SHRINK_THRESHOLD);
        }
    }
}

impl<W: Write + Send + 'static> AsyncWriter<W> {
    /// Creates an auto-expanding `AsyncWriter`: writes never fail with
    /// [`Error::BufferOverflow`]; the buffer grows on demand.
    pub fn new(sink: W) -> Self {
        Self::build(sink, None)
    }

    /// Creates an `AsyncWriter` with a fixed buffer capacity. A write
    /// that does not fit fails with [`Error::BufferOverflow`]; callers
    /// can use [`wait_for_space`](Self::wait_for_space) to back off.
    pub fn bounded(capacity: usize, sink: W) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        Self::build(sink, Some(capacity))
    }

    fn build(sink: W, limit: Option<usize>) -> Self {
        let initial = limit.map_or(INITIAL_BUFFER, |cap| cap.min(INITIAL_BUFFER));
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    buf: Vec::with_capacity(initial),
                    limit,
                    flush_mark: None,
                    closed: false,
                    error: None,
                    worker: Worker::Absent,
                }),
                work: Condvar::new(),
                idle: Condvar::new(),
                sink: Mutex::new(Some(sink)),
            }),
        }
    }

    /// Appends `data` to the buffer and returns immediately.
    ///
    /// Fails if the instance is poisoned or closed, or with
    /// [`Error::BufferOverflow`] when a bounded buffer cannot take the
    /// whole slice. Never blocks.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut st = self.inner.state.lock();
        st.check_open()?;
        if data.is_empty() {
            return Ok(());
        }
        let free = st.free_space();
        if data.len() > free {
            return Err(Error::buffer_overflow(data.len(), free));
        }
        st.buf.extend_from_slice(data);
        self.ensure_worker(&mut st)?;
        self.inner.work.notify_one();
        Ok(())
    }

    /// Records a flush checkpoint covering everything buffered so far and
    /// returns immediately, superseding any earlier pending checkpoint.
    /// The sink is flushed once the covered data has been written.
    pub fn flush(&self) -> Result<()> {
        let mut st = self.inner.state.lock();
        st.check_open()?;
        st.flush_mark = Some(st.buf.len());
        self.ensure_worker(&mut st)?;
        self.inner.work.notify_one();
        Ok(())
    }

    /// Marks the writer closed and returns immediately; the worker drains
    /// the remaining buffer and then closes the sink. Idempotent, but a
    /// poisoned instance surfaces its error instead.
    pub fn close(&self) -> Result<()> {
        let mut st = self.inner.state.lock();
        if let Some(err) = st.poisoned() {
            return Err(err);
        }
        if st.closed {
            return Ok(());
        }
        st.closed = true;
        self.ensure_worker(&mut st)?;
        self.inner.work.notify_one();
        Ok(())
    }

    /// Blocks until at least `bytes` of free buffer space exist.
    ///
    /// Returns `true` immediately for an auto-expanding writer, and
    /// `false` without waiting when `bytes` exceeds a bounded writer's
    /// total capacity (the request could never be satisfied). A zero
    /// `timeout` means wait forever.
    pub fn wait_for_space(&self, bytes: usize, timeout: Duration) -> Result<bool> {
        let deadline = deadline_from(timeout);
        let mut st = self.inner.state.lock();
        loop {
            if let Some(err) = st.poisoned() {
                return Err(err);
            }
            if st.closed {
                return Err(Error::Closed);
            }
            match st.limit {
                None => return Ok(true),
                Some(limit) if bytes > limit => return Ok(false),
                Some(_) => {}
            }
            if st.free_space() >= bytes {
                return Ok(true);
            }
            if !self.wait_for_wakeup(&mut st, deadline) {
                return Ok(st.free_space() >= bytes);
            }
        }
    }

    /// Blocks until there is no buffered data, no pending flush, and (if
    /// closed) the close has completed. A zero `timeout` means wait
    /// forever. Surfaces the poison error if the worker failed.
    pub fn wait_for_idle(&self, timeout: Duration) -> Result<bool> {
        let deadline = deadline_from(timeout);
        let mut st = self.inner.state.lock();
        loop {
            if let Some(err) = st.poisoned() {
                return Err(err);
            }
            if st.is_idle() {
                return Ok(true);
            }
            if !self.wait_for_wakeup(&mut st, deadline) {
                return Ok(st.is_idle());
            }
        }
    }

    /// The error that poisoned this writer, if any.
    pub fn last_error(&self) -> Option<Arc<io::Error>> {
        self.inner.state.lock().error.clone()
    }

    /// Current free buffer space; `usize::MAX` for an auto-expanding writer.
    pub fn available_space(&self) -> usize {
        self.inner.state.lock().free_space()
    }

    /// Whether buffered data, a pending flush, or an unfinished close remains.
    pub fn is_work_outstanding(&self) -> bool {
        !self.inner.state.lock().is_idle()
    }

    // Returns false when the deadline passed without a wakeup.
    fn wait_for_wakeup(&self, st: &mut MutexGuard<'_, State>, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                self.inner.idle.wait(st);
                true
            }
            Some(deadline) => !self.inner.idle.wait_until(st, deadline).timed_out(),
        }
    }

    fn ensure_worker(&self, st: &mut MutexGuard<'_, State>) -> Result<()> {
        if st.worker == Worker::Absent {
            let inner = Arc::clone(&self.inner);
            thread::Builder::new()
                .name("streamkit-async-writer".into())
                .spawn(move || worker_loop(&inner))
                .map_err(Error::Io)?;
            st.worker = Worker::Running;
            log::debug!("async writer worker started");
        }
        Ok(())
    }
}

// The zero-means-forever timeout convention shared by both waiters.
fn deadline_from(timeout: Duration) -> Option<Instant> {
    (timeout != Duration::ZERO).then(|| Instant::now() + timeout)
}

enum Step {
    Write,
    Flush,
    Close,
}

fn worker_loop<W: Write + Send>(inner: &Inner<W>) {
    let Some(mut sink) = inner.sink.lock().take() else {
        debug_assert!(false, "worker started twice");
        return;
    };
    let mut scratch: Vec<u8> = Vec::new();

    loop {
        let step = {
            let mut st = inner.state.lock();
            loop {
                if !st.buf.is_empty() {
                    scratch.clear();
                    scratch.extend_from_slice(&st.buf);
                    break Step::Write;
                }
                if st.flush_mark.is_some() {
                    break Step::Flush;
                }
                if st.closed {
                    break Step::Close;
                }
                inner.work.wait(&mut st);
            }
        };

        // All sink calls happen outside the lock so callers keep their
        // never-blocks guarantee even against a slow sink.
        match step {
            Step::Write => {
                let result = sink.write_all(&scratch);
                let mut st = inner.state.lock();
                match result {
                    Ok(()) => {
                        let written = scratch.len();
                        st.buf.drain(..written);
                        st.shrink_if_oversized();
                        if let Some(mark) = st.flush_mark {
                            st.flush_mark = Some(mark.saturating_sub(written));
                        }
                        inner.idle.notify_all();
                    }
                    Err(err) => {
                        st.fail(err);
                        inner.idle.notify_all();
                        return;
                    }
                }
            }
            Step::Flush => {
                let result = sink.flush();
                let mut st = inner.state.lock();
                match result {
                    Ok(()) => {
                        st.flush_mark = None;
                        inner.idle.notify_all();
                    }
                    Err(err) => {
                        st.fail(err);
                        inner.idle.notify_all();
                        return;
                    }
                }
            }
            Step::Close => {
                let result = sink.flush();
                drop(sink);
                let mut st = inner.state.lock();
                match result {
                    Ok(()) => {
                        st.worker = Worker::Exited;
                        log::debug!("async writer closed its sink");
                    }
                    Err(err) => st.fail(err),
                }
                inner.idle.notify_all();
                return;
            }
        }
    }
}

impl<W: Write + Send + 'static> Drop for AsyncWriter<W> {
    fn drop(&mut self) {
        // Best-effort: buffered data still reaches the sink through the
        // detached worker. Explicit close + wait_for_idle is the reliable
        // path.
        let _ = self.close();
    }
}

impl<W: Write + Send + 'static> Write for AsyncWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AsyncWriter::write(self, buf)?;
        Ok(buf.len())
    }

    /// Queues a flush checkpoint; does not wait for it to complete.
    fn flush(&mut self) -> io::Result<()> {
        AsyncWriter::flush(self)?;
        Ok(())
    }
}
