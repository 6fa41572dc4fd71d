//! Terminal destination and the in-place status block.
//!
//! A [`Console`] is the raw capability (write text, erase lines, report width). The [`Renderer`]
//! builds the status-block discipline on top of it. Which console is used is decided once at
//! startup by [`select_console`].

mod posix;
pub use posix::AnsiConsole;

mod plain;
pub use plain::PlainConsole;

mod memory;
pub use memory::MemoryConsole;

mod renderer;
pub use renderer::{FALLBACK_WIDTH, Renderer, SHRINK_DELAY, sanitize};

use std::io::{self, IsTerminal};

use tracing::debug;

/// Writable destination for the transcript and the status block.
pub trait Console: Send {
    /// Whether erase sequences are meaningful on this destination.
    fn is_interactive(&self) -> bool;

    /// Width in columns, if it can be determined.
    fn width(&self) -> Option<usize>;

    fn write_str(&mut self, s: &str) -> io::Result<()>;

    /// Clear the current line and the `n` lines above it.
    ///
    /// Afterwards the cursor sits at the start of the topmost cleared line.
    fn clear_lines(&mut self, n: usize) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn is_interactive(&self) -> bool {
        (**self).is_interactive()
    }

    fn width(&self) -> Option<usize> {
        (**self).width()
    }

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn clear_lines(&mut self, n: usize) -> io::Result<()> {
        (**self).clear_lines(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Console for the process's stdout: ANSI when it is a foreground terminal, plain otherwise.
pub fn select_console() -> Box<dyn Console> {
    let terminal = io::stdout().is_terminal();
    let background = terminal && is_background();
    debug!(target: "prun.core.term", terminal, background, "selecting console");

    if terminal && !background {
        Box::new(AnsiConsole::stdout())
    } else {
        Box::new(PlainConsole::stdout())
    }
}

/// Reports whether this process is outside the foreground process group of its terminal.
#[cfg(unix)]
pub fn is_background() -> bool {
    let foreground = unsafe { libc::tcgetpgrp(libc::STDOUT_FILENO) };
    if foreground < 0 {
        return false;
    }
    foreground != unsafe { libc::getpgrp() }
}

#[cfg(not(unix))]
pub fn is_background() -> bool {
    false
}
