use std::{
    borrow::Cow,
    io,
    time::{Duration, Instant},
};

use crate::term::Console;

/// Columns assumed when the console cannot report its width.
pub const FALLBACK_WIDTH: usize = 80;
/// How long a smaller status block must stay smaller before the drawn block shrinks.
pub const SHRINK_DELAY: Duration = Duration::from_millis(500);

/// Keeps a status block pinned below a scrolling transcript.
///
/// Every redraw first erases exactly the lines drawn last time. On a non-interactive console
/// the status block is never drawn and only transcript lines are written.
pub struct Renderer<C> {
    console: C,
    interactive: bool,
    /// Lines currently on screen; the last one has no trailing newline.
    shown: Vec<String>,
    peak: usize,
    peak_at: Option<Instant>,
}

impl<C: Console> Renderer<C> {
    pub fn new(console: C) -> Self {
        let interactive = console.is_interactive();
        Self {
            console,
            interactive,
            shown: Vec::new(),
            peak: 0,
            peak_at: None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Number of status lines currently drawn.
    pub fn drawn_lines(&self) -> usize {
        self.shown.len()
    }

    /// Append `text` as a line above the status block.
    pub fn write_transcript_line(&mut self, text: &str) -> io::Result<()> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text.trim_end_matches('\n'));
        line.push('\n');

        if !self.interactive {
            self.console.write_str(&line)?;
            return self.console.flush();
        }

        self.undo_status()?;
        self.console.write_str(&line)?;
        let block = self.shown.join("\n");
        self.console.write_str(&block)?;
        self.console.flush()
    }

    pub fn set_status(&mut self, lines: Vec<String>) -> io::Result<()> {
        self.set_status_at(lines, Instant::now())
    }

    /// Replace the status block as of `now`.
    ///
    /// Control characters become spaces and lines are cut one column short of the console width,
    /// so every line occupies exactly one row. A block smaller than the recent maximum is padded
    /// with blank lines until it has stayed smaller for [`SHRINK_DELAY`].
    pub fn set_status_at(&mut self, lines: Vec<String>, now: Instant) -> io::Result<()> {
        if !self.interactive || lines.is_empty() {
            return Ok(());
        }

        let width = self.console.width().unwrap_or(FALLBACK_WIDTH);
        let cols = width.saturating_sub(1).max(1);
        let lines: Vec<String> = self
            .damp(lines, now)
            .into_iter()
            .map(|line| truncate(&sanitize(line.trim_end_matches('\n')), cols))
            .collect();

        self.undo_status()?;
        self.console.write_str(&lines.join("\n"))?;
        self.shown = lines;
        self.console.flush()
    }

    /// Erase the status block for good.
    pub fn finish(&mut self) -> io::Result<()> {
        self.undo_status()?;
        self.shown.clear();
        self.peak = 0;
        self.peak_at = None;
        self.console.flush()
    }

    fn undo_status(&mut self) -> io::Result<()> {
        match self.shown.len() {
            0 => Ok(()),
            n => self.console.clear_lines(n - 1),
        }
    }

    fn damp(&mut self, mut lines: Vec<String>, now: Instant) -> Vec<String> {
        let holding = self
            .peak_at
            .is_some_and(|at| now.saturating_duration_since(at) < SHRINK_DELAY);

        if lines.len() >= self.peak || !holding {
            self.peak = lines.len();
            self.peak_at = Some(now);
        } else {
            lines.resize(self.peak, String::new());
        }
        lines
    }
}

/// Replace control characters with spaces so the text stays on one terminal row.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect(),
    )
}

fn truncate(line: &str, width: usize) -> String {
    match line.char_indices().nth(width) {
        Some((cut, _)) => line[..cut].to_string(),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::MemoryConsole;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn redraw_erases_exactly_the_previous_block() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console.clone());
        let t0 = Instant::now();

        r.set_status_at(lines(3), t0).unwrap();
        r.set_status_at(lines(3), t0 + ms(10)).unwrap();

        assert_eq!(
            console.contents(),
            "line 0\nline 1\nline 2\x1b[1G\x1b[2K\x1b[1A\x1b[2K\x1b[1A\x1b[2Kline 0\nline 1\nline 2"
        );
    }

    #[test]
    fn transcript_lines_go_above_the_block() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console.clone());

        r.write_transcript_line("before").unwrap();
        r.set_status(vec!["status".into()]).unwrap();
        r.write_transcript_line("after").unwrap();

        assert_eq!(
            console.contents(),
            "before\nstatus\x1b[1G\x1b[2Kafter\nstatus"
        );
        assert_eq!(r.drawn_lines(), 1);
    }

    #[test]
    fn lines_stop_short_of_the_last_column() {
        let console = MemoryConsole::interactive(Some(5));
        let mut r = Renderer::new(console.clone());

        r.set_status(vec!["abcdefgh".into(), "äöüßéx".into(), "ok".into()])
            .unwrap();

        assert_eq!(console.contents(), "abcd\näöüß\nok");
    }

    #[test]
    fn one_column_console_still_shows_a_character() {
        let console = MemoryConsole::interactive(Some(1));
        let mut r = Renderer::new(console.clone());

        r.set_status(vec!["xyz".into()]).unwrap();

        assert_eq!(console.contents(), "x");
    }

    #[test]
    fn embedded_line_breaks_do_not_break_erasing() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console.clone());
        let t0 = Instant::now();

        let block = || vec!["hdr".to_string(), "two\nwords\rhere".to_string()];
        r.set_status_at(block(), t0).unwrap();
        r.set_status_at(block(), t0 + ms(10)).unwrap();

        assert_eq!(
            console.contents(),
            "hdr\ntwo words here\x1b[1G\x1b[2K\x1b[1A\x1b[2Khdr\ntwo words here"
        );
        assert_eq!(r.drawn_lines(), 2);
    }

    #[test]
    fn sanitize_borrows_clean_text() {
        assert!(matches!(sanitize("plain"), Cow::Borrowed("plain")));
        assert_eq!(sanitize("a\tb\x1bc"), "a b c");
    }

    #[test]
    fn unknown_width_falls_back_to_eighty_columns() {
        let console = MemoryConsole::interactive(None);
        let mut r = Renderer::new(console.clone());

        r.set_status(vec!["x".repeat(200)]).unwrap();

        assert_eq!(console.contents(), "x".repeat(FALLBACK_WIDTH - 1));
    }

    #[test]
    fn redirected_console_gets_transcript_only() {
        let console = MemoryConsole::redirected();
        let mut r = Renderer::new(console.clone());

        r.set_status(lines(2)).unwrap();
        r.write_transcript_line("one").unwrap();
        r.set_status(lines(4)).unwrap();
        r.write_transcript_line("two").unwrap();
        r.finish().unwrap();

        assert_eq!(console.contents(), "one\ntwo\n");
        assert_eq!(r.drawn_lines(), 0);
    }

    #[test]
    fn oscillating_block_does_not_shrink_early() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console);
        let t0 = Instant::now();

        r.set_status_at(lines(3), t0).unwrap();
        for step in 1..=10 {
            let n = if step % 2 == 0 { 3 } else { 2 };
            r.set_status_at(lines(n), t0 + ms(step * 10)).unwrap();
            assert_eq!(r.drawn_lines(), 3, "step {step}");
        }

        // last maximum at t0+100ms
        r.set_status_at(lines(2), t0 + ms(599)).unwrap();
        assert_eq!(r.drawn_lines(), 3);

        r.set_status_at(lines(2), t0 + ms(600)).unwrap();
        assert_eq!(r.drawn_lines(), 2);
    }

    #[test]
    fn padding_uses_blank_lines() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console.clone());
        let t0 = Instant::now();

        r.set_status_at(lines(2), t0).unwrap();
        r.set_status_at(lines(1), t0 + ms(50)).unwrap();

        assert!(console.contents().ends_with("\x1b[2Kline 0\n"));
    }

    #[test]
    fn growth_is_drawn_immediately() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console);
        let t0 = Instant::now();

        r.set_status_at(lines(1), t0).unwrap();
        r.set_status_at(lines(4), t0 + ms(1)).unwrap();

        assert_eq!(r.drawn_lines(), 4);
    }

    #[test]
    fn finish_clears_block() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console.clone());

        r.set_status(lines(2)).unwrap();
        r.finish().unwrap();

        assert_eq!(r.drawn_lines(), 0);
        assert!(console.contents().ends_with("line 1\x1b[1G\x1b[2K\x1b[1A\x1b[2K"));
    }

    #[test]
    fn write_errors_surface() {
        let console = MemoryConsole::interactive(Some(80));
        let mut r = Renderer::new(console.clone());
        console.close();

        assert!(r.set_status(lines(1)).is_err());
        assert!(r.write_transcript_line("x").is_err());
    }
}
