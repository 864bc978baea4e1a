//! Framed I/O primitives
//!
//! [`read_full`] and [`write_vectored_full`] transfer exactly the requested
//! number of bytes or fail. Partial progress advances the cursor; a signal
//! interruption is retried for free; a timeout is retried only while the
//! [`RetryPolicy`] allows it.

use std::io::{self, IoSlice, Read, Write};

use tracing::{debug, error, trace};

use super::channel::{classify, ErrorClass, RetryPolicy};
use crate::error::{Error, Result};

/// Read exactly `buf.len()` bytes from `channel`.
///
/// A zero-byte read means the peer closed the channel and is reported as
/// [`Error::ConnectionClosed`] with the number of bytes still owed.
pub fn read_full<C>(channel: &mut C, buf: &mut [u8], policy: &RetryPolicy<'_>) -> Result<()>
where
    C: Read + ?Sized,
{
    let mut budget = policy.budget();
    let mut filled = 0;

    while filled < buf.len() {
        match channel.read(&mut buf[filled..]) {
            Ok(0) => {
                let remaining = buf.len() - filled;
                debug!("connection is closed ({} bytes left)", remaining);
                return Err(Error::ConnectionClosed { remaining });
            }
            Ok(n) => filled += n,
            Err(e) => match classify(&e) {
                ErrorClass::Interrupted => continue,
                ErrorClass::Timeout if budget.take() => {
                    trace!("read timed out, retrying ({} bytes left)", buf.len() - filled);
                    continue;
                }
                _ => {
                    error!("failed to read from channel: {}", e);
                    return Err(Error::Io(e));
                }
            },
        }
    }

    Ok(())
}

/// Write every byte of `spans`, in order, as one logical transfer.
pub fn write_vectored_full<C>(
    channel: &mut C,
    spans: &[&[u8]],
    policy: &RetryPolicy<'_>,
) -> Result<()>
where
    C: Write + ?Sized,
{
    let mut budget = policy.budget();
    let mut cursor = SpanCursor::new(spans);
    let mut remaining = cursor.remaining();

    while remaining > 0 {
        let slices = cursor.io_slices();
        match channel.write_vectored(&slices) {
            Ok(0) => {
                error!("failed to write to channel: zero-length write");
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                )));
            }
            Ok(n) => {
                cursor.advance(n);
                remaining = remaining.saturating_sub(n);
            }
            Err(e) => match classify(&e) {
                ErrorClass::Interrupted => continue,
                ErrorClass::Timeout if budget.take() => {
                    trace!("write timed out, retrying ({} bytes left)", remaining);
                    continue;
                }
                _ => {
                    error!("failed to write to channel: {}", e);
                    return Err(Error::Io(e));
                }
            },
        }
    }

    Ok(())
}

// =============================================================================
// Span Cursor
// =============================================================================

/// Position within an ordered list of borrowed byte spans.
///
/// The spans themselves are never modified; the cursor tracks the index of
/// the first unsent span and how far into it the transfer has progressed.
#[derive(Debug, Clone)]
pub struct SpanCursor<'a> {
    spans: &'a [&'a [u8]],
    index: usize,
    offset: usize,
}

impl<'a> SpanCursor<'a> {
    pub fn new(spans: &'a [&'a [u8]]) -> Self {
        let mut cursor = Self {
            spans,
            index: 0,
            offset: 0,
        };
        cursor.advance(0);
        cursor
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.spans[self.index.min(self.spans.len())..]
            .iter()
            .map(|s| s.len())
            .sum::<usize>()
            - self.offset
    }

    pub fn is_done(&self) -> bool {
        self.index >= self.spans.len()
    }

    /// Index of the first span with unsent bytes.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Offset into the span at [`Self::index`].
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Consume `n` bytes, skipping exhausted spans.
    pub fn advance(&mut self, mut n: usize) {
        while self.index < self.spans.len() {
            let left = self.spans[self.index].len() - self.offset;
            if n < left {
                self.offset += n;
                return;
            }
            n -= left;
            self.index += 1;
            self.offset = 0;
        }
    }

    /// Unsent bytes as a scatter-gather list.
    pub fn io_slices(&self) -> Vec<IoSlice<'a>> {
        let spans: &'a [&'a [u8]] = self.spans;
        let (first, offset) = (self.index, self.offset);
        spans
            .iter()
            .enumerate()
            .skip(first)
            .map(|(i, span)| {
                let span: &'a [u8] = span;
                if i == first {
                    IoSlice::new(&span[offset..])
                } else {
                    IoSlice::new(span)
                }
            })
            .collect()
    }
}
