use std::{
    fmt,
    io::{self, BufWriter, Stdout, Write},
};

use crossterm::{
    Command, queue,
    cursor::{MoveToColumn, MoveUp},
    terminal::{Clear, ClearType},
};

use crate::term::Console;

/// Escape sequence clearing the current line and the `n` lines above it.
pub(crate) fn clear_sequence(n: usize) -> String {
    let mut seq = String::with_capacity(8 + n * 8);
    // writing into a String cannot fail
    let _ = write_clear(&mut seq, n);
    seq
}

fn write_clear(out: &mut impl fmt::Write, n: usize) -> fmt::Result {
    MoveToColumn(0).write_ansi(out)?;
    Clear(ClearType::CurrentLine).write_ansi(out)?;
    for _ in 0..n {
        MoveUp(1).write_ansi(out)?;
        Clear(ClearType::CurrentLine).write_ansi(out)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum WidthSource {
    Stdout,
    Fixed(usize),
}

/// Interactive console driven by VT100/ANSI control sequences.
pub struct AnsiConsole<W> {
    out: W,
    width: WidthSource,
}

impl AnsiConsole<BufWriter<Stdout>> {
    pub fn stdout() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
            width: WidthSource::Stdout,
        }
    }
}

impl<W: Write + Send> AnsiConsole<W> {
    /// Console on an arbitrary writer with a fixed width.
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: WidthSource::Fixed(width),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Console for AnsiConsole<W> {
    fn is_interactive(&self) -> bool {
        true
    }

    fn width(&self) -> Option<usize> {
        match self.width {
            WidthSource::Stdout => terminal_size::terminal_size().map(|(w, _)| usize::from(w.0)),
            WidthSource::Fixed(w) => Some(w),
        }
    }

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    fn clear_lines(&mut self, n: usize) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        for _ in 0..n {
            queue!(self.out, MoveUp(1), Clear(ClearType::CurrentLine))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_sequence_walks_up_n_lines() {
        assert_eq!(clear_sequence(0), "\x1b[1G\x1b[2K");
        assert_eq!(clear_sequence(2), "\x1b[1G\x1b[2K\x1b[1A\x1b[2K\x1b[1A\x1b[2K");
    }

    #[test]
    fn writes_reach_the_inner_writer() {
        let mut console = AnsiConsole::new(Vec::new(), 40);
        console.write_str("abc").unwrap();
        console.clear_lines(1).unwrap();
        console.flush().unwrap();

        assert_eq!(console.width(), Some(40));
        assert_eq!(console.into_inner(), clear_prefixed("abc", 1));
    }

    #[test]
    fn console_and_sequence_agree() {
        let mut console = AnsiConsole::new(Vec::new(), 40);
        console.clear_lines(3).unwrap();

        assert_eq!(console.into_inner(), clear_prefixed("", 3));
    }

    fn clear_prefixed(prefix: &str, n: usize) -> Vec<u8> {
        format!("{prefix}{}", clear_sequence(n)).into_bytes()
    }
}
