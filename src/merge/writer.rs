use std::io::{self, Write};

/// Accumulates output lines and writes them out in large batches.
///
/// `buf.len()` is the occupied size and `capacity - buf.len()` the space
/// left; a line that does not fit triggers a flush of everything held.
pub struct LineWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
    lines_written: u64,
    bytes_written: u64,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
            lines_written: 0,
            bytes_written: 0,
        }
    }

    #[inline]
    fn available(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append one line, flushing first if it would not fit.
    pub fn emit(&mut self, line: &[u8]) -> io::Result<()> {
        if self.available() < line.len() {
            self.flush_buffer()?;
        }
        if line.len() > self.capacity {
            // Larger than the whole buffer: hand it straight to the sink.
            write_exact(&mut self.inner, line)?;
        } else {
            self.buf.extend_from_slice(line);
        }
        debug_assert!(self.buf.len() <= self.capacity);
        self.lines_written += 1;
        self.bytes_written += line.len() as u64;
        Ok(())
    }

    /// Write out the buffered bytes and reset the buffer to empty.
    pub fn flush_buffer(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            write_exact(&mut self.inner, &self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Flush everything and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Single write of `data`; a short write is an error, not a retry.
fn write_exact(out: &mut impl Write, data: &[u8]) -> io::Result<()> {
    loop {
        match out.write(data) {
            Ok(n) if n == data.len() => return Ok(()),
            Ok(n) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", n, data.len()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
