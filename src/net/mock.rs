//! Scripted in-memory channel for transport tests
//!
//! Serves reads from a fixed input buffer and collects writes, handing out at
//! most `chunk` bytes per call so partial transfers are exercised. Errors can
//! be injected ahead of the data, or forever.

use std::collections::VecDeque;
use std::io::{self, IoSlice, Read, Write};

#[derive(Debug, Default)]
pub struct MockChannel {
    input: Vec<u8>,
    pos: usize,
    output: Vec<u8>,
    chunk: Option<usize>,
    read_faults: VecDeque<io::ErrorKind>,
    write_faults: VecDeque<io::ErrorKind>,
    always: Option<io::ErrorKind>,
    read_calls: usize,
    write_calls: usize,
}

impl MockChannel {
    pub fn with_input(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Limit every read and write call to `chunk` bytes.
    pub fn chunked(mut self, chunk: usize) -> Self {
        self.chunk = Some(chunk);
        self
    }

    /// Fail the next `count` reads with `kind`.
    pub fn fail_reads(mut self, kind: io::ErrorKind, count: usize) -> Self {
        self.read_faults.extend(std::iter::repeat(kind).take(count));
        self
    }

    /// Fail the next `count` writes with `kind`.
    pub fn fail_writes(mut self, kind: io::ErrorKind, count: usize) -> Self {
        self.write_faults.extend(std::iter::repeat(kind).take(count));
        self
    }

    /// Fail every read and write with `kind`.
    pub fn always_fail(mut self, kind: io::ErrorKind) -> Self {
        self.always = Some(kind);
        self
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    fn limit(&self, wanted: usize) -> usize {
        self.chunk.map_or(wanted, |chunk| wanted.min(chunk))
    }
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_calls += 1;
        if let Some(kind) = self.always {
            return Err(io::Error::from(kind));
        }
        if let Some(kind) = self.read_faults.pop_front() {
            return Err(io::Error::from(kind));
        }

        let available = self.input.len() - self.pos;
        let n = self.limit(buf.len().min(available));
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_vectored(&[IoSlice::new(buf)])
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        self.write_calls += 1;
        if let Some(kind) = self.always {
            return Err(io::Error::from(kind));
        }
        if let Some(kind) = self.write_faults.pop_front() {
            return Err(io::Error::from(kind));
        }

        let total: usize = bufs.iter().map(|b| b.len()).sum();
        let mut budget = self.limit(total);
        let mut written = 0;
        for buf in bufs {
            if budget == 0 {
                break;
            }
            let n = buf.len().min(budget);
            self.output.extend_from_slice(&buf[..n]);
            budget -= n;
            written += n;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
