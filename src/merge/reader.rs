use std::io::{self, Read};

/// Buffered line source over a fixed-capacity byte window.
///
/// Bytes in `window[start..start + size]` have been read from the stream but
/// not yet handed out. Lines are returned whole, including their `\n`
/// terminator; a line longer than the window is assembled across refills.
pub struct LineReader<R> {
    inner: R,
    window: Box<[u8]>,
    start: usize,
    size: usize,
    eof: bool,
    lines_read: u64,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            window: vec![0u8; capacity.max(1)].into_boxed_slice(),
            start: 0,
            size: 0,
            eof: false,
            lines_read: 0,
        }
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.window.len()
    }

    /// Number of lines returned so far.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Move the unread bytes to the front of the window and read more after
    /// them. Returns the number of bytes read; 0 means end of stream.
    pub fn fill(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        if self.start > 0 {
            self.window
                .copy_within(self.start..self.start + self.size, 0);
            self.start = 0;
        }
        debug_assert!(self.size < self.window.len(), "fill on a full window");
        loop {
            match self.inner.read(&mut self.window[self.size..]) {
                Ok(n) => {
                    if n == 0 {
                        self.eof = true;
                    }
                    self.size += n;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Replace the contents of `line` with the next line of the stream.
    ///
    /// Returns `Ok(false)` at end of stream. Trailing bytes without a
    /// terminator form a final line and get a `\n` appended.
    pub fn take_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
        line.clear();
        // Bytes of the unread region already searched for a terminator.
        let mut scanned = 0;
        loop {
            debug_assert!(self.start + self.size <= self.window.len());
            let unread = &self.window[self.start + scanned..self.start + self.size];
            if let Some(pos) = memchr::memchr(b'\n', unread) {
                let end = scanned + pos + 1;
                line.extend_from_slice(&self.window[self.start..self.start + end]);
                self.start += end;
                self.size -= end;
                if self.size == 0 {
                    self.start = 0;
                }
                self.lines_read += 1;
                return Ok(true);
            }
            scanned = self.size;

            if self.size == self.window.len() {
                // Full window, no terminator: spill it and keep reading.
                line.extend_from_slice(&self.window[..self.size]);
                self.start = 0;
                self.size = 0;
                scanned = 0;
            }
            if self.fill()? == 0 {
                break;
            }
        }

        line.extend_from_slice(&self.window[self.start..self.start + self.size]);
        self.start = 0;
        self.size = 0;
        if line.is_empty() {
            return Ok(false);
        }
        line.push(b'\n');
        self.lines_read += 1;
        Ok(true)
    }
}
