//! Write batching for output sessions.
//!
//! [`WriteBuffer`] accumulates small writes into a fixed-capacity buffer and
//! flushes to the underlying writer in large chunks.  Hosts usually feed a
//! write session sector by sector, so batching cuts the number of `write`
//! syscalls by the buffer-size / sector-size ratio.
//!
//! Seeking flushes first, so the logical position always equals the
//! position of the underlying writer plus the pending bytes.

use std::io::{self, Seek, SeekFrom, Write};

pub struct WriteBuffer<W: Write> {
    inner:    W,
    buf:      Vec<u8>,
    capacity: usize,
}

impl<W: Write> WriteBuffer<W> {
    /// `capacity` should be a multiple of the sector size.
    pub fn new(inner: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes accepted but not yet handed to the inner writer.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Hand the pending bytes to the inner writer.  They are dropped even if
    /// the write fails part way.
    fn flush_buf(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = self.inner.write_all(&self.buf);
        self.buf.clear();
        result
    }
}

impl<W: Write> Write for WriteBuffer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.buf.len() + buf.len() > self.capacity {
            self.flush_buf()?;
        }
        // Large writes bypass the buffer entirely.
        if buf.len() >= self.capacity {
            self.inner.write_all(buf)?;
        } else {
            self.buf.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        self.inner.flush()
    }
}

impl<W: Write + Seek> Seek for WriteBuffer<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.flush_buf()?;
        self.inner.seek(pos)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.inner.stream_position()? + self.buf.len() as u64)
    }
}
