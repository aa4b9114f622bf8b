use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Custom error types for the streamkit library.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O errors from std::io operations, including
    /// interruption (`ErrorKind::Interrupted`), which is propagated to
    /// the caller rather than swallowed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A bounded `AsyncWriter` cannot accept the requested bytes.
    #[error("buffer overflow: {requested} bytes requested, {available} available")]
    BufferOverflow { requested: usize, available: usize },

    /// Operation attempted on a stream that has already been closed.
    #[error("stream is closed")]
    Closed,

    /// Operation attempted on a pipe after one of its ends was closed.
    #[error("pipe is closed")]
    PipeClosed,

    /// The source ran out of bytes before the requested data was read.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The background writer hit a fatal sink error; the original error
    /// permanently poisons the instance and is surfaced on every call.
    #[error("background writer failed: {0}")]
    WriterPoisoned(Arc<io::Error>),

    /// Operation attempted on a file update that was already canceled.
    #[error("file update already canceled")]
    AlreadyCanceled,
}

impl Error {
    /// Create a new `BufferOverflow` error with the requested and available sizes.
    pub fn buffer_overflow(requested: usize, available: usize) -> Self {
        Self::BufferOverflow {
            requested,
            available,
        }
    }
}

// The stream types implement the `std::io` traits, whose methods must
// return `io::Error`. Map each variant to a faithful `ErrorKind` so the
// taxonomy stays observable through the trait surface.
impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::UnexpectedEof => {
                io::Error::new(io::ErrorKind::UnexpectedEof, Error::UnexpectedEof)
            }
            Error::PipeClosed => io::Error::new(io::ErrorKind::BrokenPipe, Error::PipeClosed),
            Error::WriterPoisoned(source) => {
                let kind = source.kind();
                io::Error::new(kind, Error::WriterPoisoned(source))
            }
            Error::BufferOverflow {
                requested,
                available,
            } => io::Error::new(
                io::ErrorKind::WouldBlock,
                Error::BufferOverflow {
                    requested,
                    available,
                },
            ),
            other => io::Error::other(other),
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;
