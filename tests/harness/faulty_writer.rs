use std::io::{self, Write};

pub enum FaultMode {
    /// Accept this many bytes, then fail every subsequent write.
    FailAfter(usize),
    /// Writes succeed; every flush fails.
    FailFlush,
}

/// A sink with injectable faults, for exercising poisoning and rollback
/// paths.
pub struct FaultyWriter<W: Write> {
    inner: W,
    mode: FaultMode,
    written: usize,
}

impl<W: Write> FaultyWriter<W> {
    pub fn new(inner: W, mode: FaultMode) -> Self {
        Self {
            inner,
            mode,
            written: 0,
        }
    }
}

impl<W: Write> Write for FaultyWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.mode {
            FaultMode::FailAfter(limit) if self.written + buf.len() > limit => Err(
                io::Error::new(io::ErrorKind::Other, "injected write fault"),
            ),
            _ => {
                let n = self.inner.write(buf)?;
                self.written += n;
                Ok(n)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.mode {
            FaultMode::FailFlush => Err(io::Error::new(
                io::ErrorKind::Other,
                "injected flush fault",
            )),
            _ => self.inner.flush(),
        }
    }
}
