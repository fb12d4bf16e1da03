// src/stream.rs

//! Byte-to-line decoding for streamed process output.
//!
//! [`LineStream`] is an [`io::Write`] sink that re-chunks arbitrary byte
//! writes into lines and hands each completed line to a callback, in order,
//! on the writing task. Attach one to a [`Cmd`](crate::Cmd) via
//! [`stdout_writer`](crate::Cmd::stdout_writer) to observe output while the
//! process is still running, instead of waiting for the buffered accessors.
//!
//! An unterminated tail is carried in a fixed-size buffer between writes.
//! A line that outgrows that buffer is reported as a [`LineBufferOverflow`]
//! and the carry is left untouched, so the caller decides whether to grow
//! the buffer, drop the line, or stop feeding the stream.

use std::io::{self, Write};

use thiserror::Error;

/// Default capacity of the carry buffer holding an unterminated line.
pub const DEFAULT_LINE_BUFFER_SIZE: usize = 16384;

/// A line did not fit in the carry buffer.
///
/// `line` holds the whole unterminated line (previously carried bytes plus
/// the rejected tail). The carry buffer itself is unchanged: feeding the
/// same tail again reproduces this error, and feeding terminated lines
/// keeps working.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "line does not contain newline and is {} bytes too long to buffer (buffer size: {buffer_size})",
    .line.len() - .buffer_size
)]
pub struct LineBufferOverflow {
    /// The full unterminated line, decoded lossily.
    pub line: String,
    /// Carry buffer capacity when the overflow happened.
    pub buffer_size: usize,
    /// Free carry space when the overflow happened.
    pub buffer_free: usize,
}

/// Stateful byte-to-line decoder.
///
/// Lines end at `\n`; a `\r` immediately before the `\n` is stripped with
/// it, even when the two bytes arrive in different writes. No other `\r`
/// is treated specially. Blank lines are delivered as `""`. Bytes are
/// decoded as UTF-8, lossily, once per complete line.
///
/// Not synchronized: one writer at a time.
pub struct LineStream {
    sink: Box<dyn FnMut(String) + Send>,
    carry: Vec<u8>,
    capacity: usize,
}

impl LineStream {
    /// Create a decoder delivering each complete line to `sink`.
    ///
    /// The sink runs synchronously on the writing task; a slow sink stalls
    /// whoever is writing (for process output, the drain loop).
    pub fn new(sink: impl FnMut(String) + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            carry: Vec::with_capacity(DEFAULT_LINE_BUFFER_SIZE),
            capacity: DEFAULT_LINE_BUFFER_SIZE,
        }
    }

    /// Resize the carry buffer.
    ///
    /// Call before the first write: resizing discards any buffered partial
    /// line.
    pub fn set_buffer_size(&mut self, size: usize) {
        self.capacity = size;
        self.carry = Vec::with_capacity(size);
    }

    /// Number of bytes currently carried from an unterminated line.
    pub fn buffered(&self) -> usize {
        self.carry.len()
    }

    fn emit(&mut self, segment: &[u8]) {
        let line = if self.carry.is_empty() {
            String::from_utf8_lossy(segment).into_owned()
        } else {
            let mut bytes = Vec::with_capacity(self.carry.len() + segment.len());
            bytes.extend_from_slice(&self.carry);
            bytes.extend_from_slice(segment);
            self.carry.clear();
            String::from_utf8_lossy(&bytes).into_owned()
        };
        (self.sink)(line);
    }
}

impl Write for LineStream {
    /// Feed bytes into the decoder.
    ///
    /// Returns `Ok(p.len())` when everything was consumed. When an
    /// unterminated tail does not fit in the carry buffer, any lines
    /// completed by this call are still delivered and their bytes count as
    /// a partial write (`Ok(n)` with `n < p.len()`); retrying the remainder
    /// then fails with an [`io::Error`] wrapping [`LineBufferOverflow`]
    /// (reachable through [`io::Error::get_ref`]). The carry buffer is
    /// never modified by a failing write, so `write_all` surfaces exactly
    /// one error for an oversized line and the decoder stays usable.
    fn write(&mut self, p: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        while let Some(found) = p[start..].iter().position(|&b| b == b'\n') {
            let newline = start + found;
            if newline > start && p[newline - 1] == b'\r' {
                self.emit(&p[start..newline - 1]);
            } else if newline == start && self.carry.last() == Some(&b'\r') {
                // The \r\n pair was split across writes.
                self.carry.pop();
                self.emit(&[]);
            } else {
                self.emit(&p[start..newline]);
            }
            start = newline + 1;
        }

        let tail = &p[start..];
        if tail.is_empty() {
            return Ok(p.len());
        }

        let free = self.capacity - self.carry.len();
        if tail.len() > free {
            if start > 0 {
                return Ok(start);
            }
            let mut line = Vec::with_capacity(self.carry.len() + tail.len());
            line.extend_from_slice(&self.carry);
            line.extend_from_slice(tail);
            return Err(io::Error::other(LineBufferOverflow {
                line: String::from_utf8_lossy(&line).into_owned(),
                buffer_size: self.capacity,
                buffer_free: free,
            }));
        }

        self.carry.extend_from_slice(tail);
        Ok(p.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
