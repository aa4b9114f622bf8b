use parking_lot::{Condvar, Mutex};
use std::io::{self, Write};
use std::sync::Arc;

/// A latch shared between a test and a [`GatedWriter`].
///
/// While closed, every sink operation parks; opening releases them all.
/// Lets tests prove that `AsyncWriter` callers return even when the sink
/// makes no progress at all.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

struct GateInner {
    open: Mutex<bool>,
    released: Condvar,
}

impl Gate {
    pub fn closed() -> Self {
        Self {
            inner: Arc::new(GateInner {
                open: Mutex::new(false),
                released: Condvar::new(),
            }),
        }
    }

    pub fn open(&self) {
        let mut open = self.inner.open.lock();
        *open = true;
        self.inner.released.notify_all();
    }

    fn wait(&self) {
        let mut open = self.inner.open.lock();
        while !*open {
            self.inner.released.wait(&mut open);
        }
    }
}

/// A writer that stalls every operation until its gate opens.
pub struct GatedWriter<W: Write> {
    inner: W,
    gate: Gate,
}

impl<W: Write> GatedWriter<W> {
    pub fn new(inner: W, gate: Gate) -> Self {
        Self { inner, gate }
    }
}

impl<W: Write> Write for GatedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.gate.wait();
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.gate.wait();
        self.inner.flush()
    }
}
