use std::time::Duration;

use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use prun_model::JobId;

use crate::term::sanitize;

const TIMESTAMP: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Marker placed before stderr lines and failure texts.
pub const ERROR_MARKER: &str = "error";

/// Which prefix parts transcript lines carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_id: bool,
    pub show_timestamp: bool,
    pub show_tag: bool,
    /// Offset used for transcript timestamps.
    pub utc_offset: UtcOffset,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_id: true,
            show_timestamp: true,
            show_tag: true,
            utc_offset: UtcOffset::UTC,
        }
    }
}

impl DisplayOptions {
    /// `<id> <timestamp> <tag> <message>` with hidden parts left out.
    pub fn transcript_line(&self, id: JobId, tag: &str, now: OffsetDateTime, message: &str) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if self.show_id {
            parts.push(id.to_string());
        }
        if self.show_timestamp {
            parts.push(self.timestamp(now));
        }
        if self.show_tag {
            parts.push(sanitize(tag).into_owned());
        }
        parts.push(message.to_string());
        parts.join(" ")
    }

    fn timestamp(&self, now: OffsetDateTime) -> String {
        now.to_offset(self.utc_offset)
            .format(TIMESTAMP)
            .unwrap_or_default()
    }
}

/// Message text for an output line, marked when it came from stderr.
pub fn output_message(line: &str, stderr: bool) -> String {
    if stderr {
        format!("{ERROR_MARKER} {line}")
    } else {
        line.to_string()
    }
}

/// Message text for a finished job.
pub fn done_message(error: Option<&str>) -> String {
    match error {
        None => "done".to_string(),
        Some(reason) => format!("{ERROR_MARKER} {reason}"),
    }
}

/// `m:ss` below an hour, `h:mm:ss` from there on.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Inputs for the first status line.
pub struct Header {
    pub elapsed: Duration,
    pub processed: u64,
    pub failed: u64,
    /// `Some` once the dispatcher reported the final total.
    pub total: Option<u64>,
    /// Jobs seen so far while the total is still unknown.
    pub seen: u64,
    pub eta: Option<Duration>,
    pub live: usize,
    pub workers: usize,
}

impl Header {
    pub fn render(&self) -> String {
        let total = match self.total {
            Some(total) => total.to_string(),
            None => format!("{}+", self.seen.max(self.processed)),
        };
        let eta = match (self.total, self.eta) {
            (Some(_), Some(eta)) => format!(", ETA {}", format_duration(eta)),
            _ => String::new(),
        };
        format!(
            "[{}] {}/{} processed ({} failed){}, {}/{} workers:",
            format_duration(self.elapsed),
            self.processed,
            total,
            self.failed,
            eta,
            self.live,
            self.workers,
        )
    }
}

/// `<tag> <last line>`, or just the tag before the job printed anything.
pub fn live_line(tag: &str, last: &str) -> String {
    let tag = sanitize(tag);
    if last.is_empty() {
        tag.into_owned()
    } else {
        format!("{tag} {last}")
    }
}

/// One-line summary printed after the run.
pub fn summary_line(processed: u64, failed: u64, elapsed: Duration) -> String {
    format!(
        "processed {processed} items ({failed} failures) in {}",
        format_duration(elapsed)
    )
}
