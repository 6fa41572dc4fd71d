use std::{
    io,
    sync::{Arc, Mutex},
};

use crate::term::{Console, posix::clear_sequence};

/// In-memory console for tests and embedding.
///
/// Clones share the same buffer, so a handle kept outside can inspect what the owner wrote.
/// Writes fail once [`MemoryConsole::close`] was called, like a destination that went away.
#[derive(Clone, Debug)]
pub struct MemoryConsole {
    inner: Arc<Mutex<Inner>>,
    interactive: bool,
    width: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    buf: Vec<u8>,
    closed: bool,
}

impl MemoryConsole {
    pub fn interactive(width: Option<usize>) -> Self {
        Self::build(true, width)
    }

    pub fn redirected() -> Self {
        Self::build(false, None)
    }

    fn build(interactive: bool, width: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            interactive,
            width,
        }
    }

    /// Everything written so far, escape sequences included.
    pub fn contents(&self) -> String {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&inner.buf).into_owned()
    }

    /// Make all further writes fail with `BrokenPipe`.
    pub fn close(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).closed = true;
    }

    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"));
        }
        inner.buf.extend_from_slice(bytes);
        Ok(())
    }
}

impl Console for MemoryConsole {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn width(&self) -> Option<usize> {
        self.width
    }

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.append(s.as_bytes())
    }

    fn clear_lines(&mut self, n: usize) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        self.append(clear_sequence(n).as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.inner.lock().unwrap_or_else(|e| e.into_inner()).closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"));
        }
        Ok(())
    }
}
