//! # StreamKit
//!
//! A small family of cooperating stream primitives: buffered background
//! writing, bit-addressable I/O, an in-process byte pipe, and crash-safe
//! file replacement.
//!
//! ## Overview
//!
//! `streamkit` wraps the standard `Read`/`Write` traits with the stream
//! behaviors that are easy to get subtly wrong:
//!
//! * **[`AsyncWriter`]** — buffered output drained by a background worker
//!   thread. `write`/`flush`/`close` never block; the first downstream
//!   error permanently poisons the instance and is surfaced to every
//!   later call.
//! * **[`BitReader`] / [`BitWriter`]** — address any byte stream at bit
//!   granularity, least-significant-bit first, with strict invariants on
//!   buffered sub-byte state. Chunking never changes the bytes produced.
//! * **[`pipe`]** — a fixed-capacity circular buffer connecting a
//!   producer thread and a consumer thread, with shutdown semantics that
//!   wake every waiter instead of leaving it hung.
//! * **[`AtomicWriteFile`]** — a writer whose `commit` is an atomic
//!   rename; any failure removes the temp file and leaves the target's
//!   prior content in place.
//!
//! ## Quick Start
//!
//! ```rust
//! use streamkit::*;
//! use std::io::Cursor;
//!
//! fn main() -> Result<()> {
//!     // Pack bit fields into bytes...
//!     let mut writer = BitWriter::new(Vec::new());
//!     writer.write_bits(0b101, 3)?;
//!     writer.write_bit(true)?;
//!     let bytes = writer.finish()?;
//!
//!     // ...and unpack them again.
//!     let mut reader = BitReader::new(Cursor::new(bytes));
//!     assert_eq!(reader.read_bits_exact(3)?, 0b101);
//!     assert!(reader.bit()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every component consumes plain `std::io` sinks and sources, so they
//! compose freely: an [`AsyncWriter`] can drain into an
//! [`AtomicWriteFile`], a [`BitWriter`] can feed a [`PipeWriter`], and
//! so on. The concurrency model is parallel OS threads — each
//! `AsyncWriter` owns at most one lazily-started worker, the pipe has no
//! worker at all, and the bitwise and atomic-file types are
//! single-threaded by design.

pub mod async_writer;
pub mod atomic_file;
pub mod bit_reader;
pub mod bit_writer;
pub mod bits;
pub mod error;
pub mod pipe;

// Re-export the main public API for user convenience.
pub use async_writer::AsyncWriter;
pub use atomic_file::AtomicWriteFile;
pub use bit_reader::{BitReader, Checkpoint};
pub use bit_writer::BitWriter;
pub use error::{Error, Result};
pub use pipe::{pipe, PipeReader, PipeWriter};
