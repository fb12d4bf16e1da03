#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use runcmd::LineStream;

/// Collects the lines emitted by a [`LineStream`] for later assertions.
#[derive(Clone, Default)]
pub struct LineCollector {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink closure that appends each line to this collector.
    pub fn sink(&self) -> impl FnMut(String) + Send + 'static {
        let lines = Arc::clone(&self.lines);
        move |line| lines.lock().unwrap().push(line)
    }

    /// A [`LineStream`] wired to this collector.
    pub fn stream(&self) -> LineStream {
        LineStream::new(self.sink())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

/// Thread-safe in-memory writer for capturing raw command output.
#[derive(Clone, Default)]
pub struct SharedWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
