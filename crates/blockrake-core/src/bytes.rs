//! Primitive wire reads over any byte source.
//!
//! Everything on disk is little-endian except where noted. The compact-size
//! integer is Bitcoin's 1/3/5/9-byte varint; it round-trips through
//! [`write_compact_size`], which the block decoder uses to reconstruct the
//! non-witness transaction serialization.

use std::io::{self, Read, Write};

use crate::error::DecodeError;

/// Upper bound for any single compact-size-driven count or allocation.
/// LBRY blocks top out in the low megabytes; anything near this limit is
/// corrupt data, not a large block.
pub(crate) const MAX_COMPACT_SIZE: u64 = 32 * 1024 * 1024;

/// Reject compact sizes that could never occur inside a well-formed block.
pub(crate) fn checked_size(value: u64) -> Result<usize, DecodeError> {
    if value > MAX_COMPACT_SIZE {
        return Err(DecodeError::OversizedCompactSize {
            value,
            limit: MAX_COMPACT_SIZE,
        });
    }
    Ok(value as usize)
}

// ==============================================================================
// WireRead
// ==============================================================================

/// Sequential primitive reads. Blanket-implemented for every `Read`; a short
/// read surfaces as `io::ErrorKind::UnexpectedEof`.
pub(crate) trait WireRead: Read {
    fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u16_le(&mut self) -> io::Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    fn read_u32_le(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64_le(&mut self) -> io::Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read four little-endian bytes and reinterpret them byte-reversed.
    /// The sequence field is surfaced this way.
    fn read_u32_be(&mut self) -> io::Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_vec(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Bitcoin's compact-size integer: one byte below 0xfd, otherwise a
    /// 0xfd/0xfe/0xff tag followed by a u16/u32/u64.
    fn read_compact_size(&mut self) -> io::Result<u64> {
        match self.read_u8()? {
            0xff => self.read_u64_le(),
            0xfe => self.read_u32_le().map(u64::from),
            0xfd => self.read_u16_le().map(u64::from),
            byte => Ok(u64::from(byte)),
        }
    }
}

impl<R: Read + ?Sized> WireRead for R {}

/// Inverse of [`WireRead::read_compact_size`].
pub(crate) fn write_compact_size<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    if value < 0xfd {
        w.write_all(&[value as u8])
    } else if value <= 0xffff {
        w.write_all(&[0xfd])?;
        w.write_all(&(value as u16).to_le_bytes())
    } else if value <= 0xffff_ffff {
        w.write_all(&[0xfe])?;
        w.write_all(&(value as u32).to_le_bytes())
    } else {
        w.write_all(&[0xff])?;
        w.write_all(&value.to_le_bytes())
    }
}

// ==============================================================================
// TeeReader
// ==============================================================================

/// Mirrors every byte read from the inner reader into a buffer.
///
/// The block decoder uses this to accumulate the non-witness transaction
/// serialization while parsing: sections that belong in the txid flow through
/// the tee, the segwit marker/flag and witness data are read from the raw
/// reader underneath.
pub(crate) struct TeeReader<'a, R: Read> {
    inner: &'a mut R,
    buf: &'a mut Vec<u8>,
}

impl<'a, R: Read> TeeReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, buf: &'a mut Vec<u8>) -> Self {
        Self { inner, buf }
    }
}

impl<R: Read> Read for TeeReader<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(out)?;
        self.buf.extend_from_slice(&out[..n]);
        Ok(n)
    }
}

// ==============================================================================
// CountingReader
// ==============================================================================

/// Tracks the number of bytes consumed, giving block files an offset for
/// framing errors and the record-size assertion without seeking.
pub(crate) struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> CountingReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(out)?;
        self.position += n as u64;
        Ok(n)
    }
}
