//! A bit-granular writer over any byte sink.

use crate::bits;
use crate::error::Result;
use bitvec::prelude::*;
use std::io::Write;

/// A writer that addresses an underlying byte sink at bit granularity.
///
/// Bits are emitted least-significant-bit first: the first bit written
/// becomes bit 0 of the first output byte. Chunking never affects the
/// output — writing a bit sequence in any partition of sub-writes
/// produces byte-identical results.
///
/// Complete bytes drain to the sink eagerly, so at most 7 bits are ever
/// buffered between calls. `flush()` flushes the sink but retains any
/// sub-byte remainder (flushing must not silently pad); `finish()` pads
/// to a byte boundary so the sink only ever receives whole bytes.
///
/// This type is for single-threaded sequential use; wrap it in external
/// synchronization if it must be shared.
pub struct BitWriter<W: Write> {
    inner: W,
    acc: u64,
    acc_len: u32,
}

impl<W: Write> BitWriter<W> {
    /// Creates a new `BitWriter` over the given sink, byte-aligned.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            acc: 0,
            acc_len: 0,
        }
    }

    /// Number of buffered sub-byte bits (0..8).
    pub fn bit_offset(&self) -> u32 {
        self.acc_len
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(u64::from(bit), 1)
    }

    /// Writes the `count` (0..=64) low-order bits of `value`.
    ///
    /// Bits above `count` are masked off. The accumulator may already
    /// hold a partial byte, so a full 64-bit value can take two packing
    /// rounds with a drain in between.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<()> {
        assert!(count <= 64, "bit count out of range: {count}");
        let mut value = value & bits::mask(count);
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(64 - self.acc_len);
            let (acc, acc_len) = bits::pack(self.acc, self.acc_len, value, take);
            self.acc = acc;
            self.acc_len = acc_len;
            value = if take == 64 { 0 } else { value >> take };
            remaining -= take;
            self.drain_complete_bytes()?;
        }
        Ok(())
    }

    /// Writes an arbitrary-length bit sequence, 64 bits at a time.
    pub fn write_bitvec(&mut self, bits: &BitSlice<u8, Lsb0>) -> Result<()> {
        for chunk in bits.chunks(64) {
            self.write_bits(chunk.load_le::<u64>(), chunk.len() as u32)?;
        }
        Ok(())
    }

    /// Writes one byte, passing straight through when byte-aligned.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.acc_len == 0 {
            self.inner.write_all(&[byte])?;
            return Ok(());
        }
        self.write_bits(u64::from(byte), 8)
    }

    /// Writes a block of whole bytes at the current bit cursor.
    ///
    /// Byte-aligned writes go to the sink directly. Otherwise the block
    /// is realigned against the buffered bits in a private copy — the
    /// caller's buffer is never mutated.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        if self.acc_len == 0 {
            self.inner.write_all(buf)?;
            return Ok(());
        }
        let mut copy = buf.to_vec();
        let carry = bits::shift_into(self.acc as u8, self.acc_len, &mut copy);
        self.inner.write_all(&copy)?;
        self.acc = u64::from(carry);
        Ok(())
    }

    /// Writes zero bits until the stream is byte-aligned.
    /// Returns the number of padding bits written (0..8).
    pub fn pad_to_byte(&mut self) -> Result<u32> {
        let pad = (8 - self.acc_len) % 8;
        if pad > 0 {
            self.write_bits(0, pad)?;
        }
        Ok(pad)
    }

    /// Flushes complete bytes and the underlying sink.
    /// Any sub-byte remainder stays buffered.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Pads to a byte boundary, flushes, and returns the sink.
    pub fn finish(mut self) -> Result<W> {
        self.pad_to_byte()?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn drain_complete_bytes(&mut self) -> Result<()> {
        let mut out = [0u8; 8];
        let mut n = 0;
        while self.acc_len >= 8 {
            let (byte, acc, acc_len) = bits::drain_byte(self.acc, self.acc_len);
            out[n] = byte;
            n += 1;
            self.acc = acc;
            self.acc_len = acc_len;
        }
        if n > 0 {
            self.inner.write_all(&out[..n])?;
        }
        Ok(())
    }
}

impl<W: Write> Write for BitWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        BitWriter::flush(self)?;
        Ok(())
    }
}
