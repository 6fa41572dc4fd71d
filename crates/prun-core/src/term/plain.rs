use std::io::{self, BufWriter, Stdout, Write};

use crate::term::Console;

/// Non-interactive destination such as a file or pipe: text only, erasing is a no-op.
pub struct PlainConsole<W> {
    out: W,
}

impl PlainConsole<BufWriter<Stdout>> {
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(io::stdout()))
    }
}

impl<W: Write + Send> PlainConsole<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Console for PlainConsole<W> {
    fn is_interactive(&self) -> bool {
        false
    }

    fn width(&self) -> Option<usize> {
        None
    }

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }

    fn clear_lines(&mut self, _n: usize) -> io::Result<()> {
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
    fn erasing_writes_nothing() {
        let mut console = PlainConsole::new(Vec::new());
        console.write_str("one\n").unwrap();
        console.clear_lines(3).unwrap();
        console.write_str("two\n").unwrap();
        console.flush().unwrap();

        assert!(!console.is_interactive());
        assert_eq!(console.width(), None);
        assert_eq!(console.into_inner(), b"one\ntwo\n".to_vec());
    }
}
