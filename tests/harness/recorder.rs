use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Observes a sink from outside the `AsyncWriter` that owns it: the
/// worker thread takes ownership of the sink and drops it on close, so
/// tests hold a `Recorder` and hand out a [`RecordingSink`].
#[derive(Default)]
pub struct Recorder {
    data: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn sink(&self) -> RecordingSink {
        RecordingSink {
            data: Arc::clone(&self.data),
            flushes: Arc::clone(&self.flushes),
            drops: Arc::clone(&self.drops),
        }
    }

    pub fn data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// How many times the sink has been dropped (closed).
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

pub struct RecordingSink {
    data: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
    drops: Arc<AtomicUsize>,
}

impl Write for RecordingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for RecordingSink {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}
