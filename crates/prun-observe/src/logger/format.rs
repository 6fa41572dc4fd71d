use std::{fmt, str::FromStr};

use crate::logger::error::LoggerError;

/// Output format of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human-readable lines, colored when stderr is a terminal.
    Text,
    /// One JSON object per event.
    Json,
    /// Native systemd journal records.
    Journald,
}

impl LoggerFormat {
    /// Whether this build can log to journald.
    pub const fn journald_available() -> bool {
        cfg!(all(target_os = "linux", feature = "journald"))
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("text") {
            Ok(LoggerFormat::Text)
        } else if name.eq_ignore_ascii_case("json") {
            Ok(LoggerFormat::Json)
        } else if name.eq_ignore_ascii_case("journald") || name.eq_ignore_ascii_case("journal") {
            if Self::journald_available() {
                Ok(LoggerFormat::Journald)
            } else {
                Err(LoggerError::JournaldNotSupported)
            }
        } else {
            Err(LoggerError::InvalidFormat(s.to_string()))
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
            LoggerFormat::Journald => "journald",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats_case_insensitively() {
        assert_eq!(" Text ".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
        assert_eq!("JSON".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = "xml".parse::<LoggerFormat>().unwrap_err();
        assert!(matches!(err, LoggerError::InvalidFormat(ref s) if s == "xml"));
    }

    #[cfg(not(all(target_os = "linux", feature = "journald")))]
    #[test]
    fn journald_requires_feature() {
        let err = "journald".parse::<LoggerFormat>().unwrap_err();
        assert!(matches!(err, LoggerError::JournaldNotSupported));
    }
}
