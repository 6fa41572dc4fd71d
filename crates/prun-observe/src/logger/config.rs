use std::io::IsTerminal;

use time::UtcOffset;

use crate::logger::format::LoggerFormat;

/// Filter used when nothing else is configured.
pub const DEFAULT_FILTER: &str = "warn";

/// How diagnostics are rendered. They always go to stderr.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directives such as `warn` or `prun.exec=debug,warn`.
    pub filter: String,
    pub with_targets: bool,
    /// ANSI colors for the text format.
    pub use_color: bool,
    /// Offset of log timestamps. See [`crate::local_offset`].
    pub utc_offset: UtcOffset,
}

impl LoggerConfig {
    pub fn new(format: LoggerFormat, filter: impl Into<String>) -> Self {
        Self {
            format,
            filter: filter.into(),
            with_targets: true,
            use_color: std::io::stderr().is_terminal(),
            utc_offset: UtcOffset::UTC,
        }
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new(LoggerFormat::Text, DEFAULT_FILTER)
    }
}
