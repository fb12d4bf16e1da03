// src/cmd/sink.rs

//! Byte sinks the drain loops fan child output into.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Ordered fan-out over several byte sinks.
///
/// Each chunk is written in full to every sink in attachment order. The
/// first sink error aborts the chunk, so capture for the owning stream
/// stops there.
pub(crate) struct MultiWriter {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl MultiWriter {
    pub(crate) fn new(sinks: Vec<Box<dyn Write + Send>>) -> Self {
        Self { sinks }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

/// Clonable in-memory buffer shared between a drain loop and the post-run
/// accessors. Reads happen only after the run has finished or been
/// cancelled, so the lock is uncontended in practice.
#[derive(Clone, Default)]
pub(crate) struct SharedBuf {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Buffer contents decoded as UTF-8, lossily.
    pub(crate) fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
