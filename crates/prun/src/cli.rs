use std::time::Duration;

use clap::Parser;
use time::UtcOffset;

use prun_core::{
    CommandTemplate, CoreError, DisplayOptions, RunConfig, Separator, dispatch::DEFAULT_PLACEHOLDER,
};
use prun_exec::pool::host_parallelism;
use prun_observe::{DEFAULT_FILTER, LoggerConfig, LoggerFormat};

/// Exit status for command-line usage errors (sysexits `EX_USAGE`).
pub const EXIT_USAGE: u8 = 64;

/// Run a command once per input line, in parallel, with a live status view.
#[derive(Debug, Parser)]
#[command(name = "prun", version)]
pub struct Cli {
    /// Number of jobs to run at the same time [default: number of CPUs]
    #[arg(short = 'p', long = "procs", value_name = "N")]
    pub procs: Option<usize>,

    /// Token replaced by each input record
    #[arg(long = "replace", value_name = "TOKEN", default_value = DEFAULT_PLACEHOLDER)]
    pub replace: String,

    /// Input records are separated by NUL instead of newline
    #[arg(short = '0', long = "null")]
    pub null: bool,

    /// Per-job timeout, e.g. 250ms, 10s, 2m, 1h; a bare number is seconds and 0 disables it
    #[arg(short = 't', long = "timeout", value_name = "DUR", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Hide the job id in transcript lines
    #[arg(long = "no-id")]
    pub no_id: bool,

    /// Hide the timestamp in transcript lines
    #[arg(long = "no-timestamp")]
    pub no_timestamp: bool,

    /// Hide the tag in transcript lines
    #[arg(long = "no-tag")]
    pub no_tag: bool,

    /// Diagnostic log filter (tracing env-filter syntax)
    #[arg(long = "log-level", env = "PRUN_LOG", default_value = DEFAULT_FILTER)]
    pub log_level: String,

    /// Diagnostic log format: text, json or journald
    #[arg(long = "log-format", env = "PRUN_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Command and its arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..
    )]
    pub command: Vec<String>,
}

impl Cli {
    pub fn logger_config(&self, utc_offset: UtcOffset) -> LoggerConfig {
        LoggerConfig::new(self.log_format, self.log_level.clone()).with_offset(utc_offset)
    }

    /// Library configuration; fails on the same errors the run would refuse to start with.
    pub fn run_config(&self, utc_offset: UtcOffset) -> Result<RunConfig, CoreError> {
        let template =
            CommandTemplate::from_argv(self.command.clone())?.with_placeholder(self.replace.clone());
        template.validate()?;

        Ok(RunConfig {
            procs: self.procs.unwrap_or_else(host_parallelism).max(1),
            timeout: self.timeout.filter(|d| !d.is_zero()),
            template,
            separator: if self.null {
                Separator::Nul
            } else {
                Separator::Newline
            },
            display: DisplayOptions {
                show_id: !self.no_id,
                show_timestamp: !self.no_timestamp,
                show_tag: !self.no_tag,
                utc_offset,
            },
        })
    }
}

/// `250ms`, `10s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{s}'"))?;

    let d = match unit {
        "ms" => Duration::from_millis(n),
        "" | "s" => Duration::from_secs(n),
        "m" => Duration::from_secs(n.saturating_mul(60)),
        "h" => Duration::from_secs(n.saturating_mul(3600)),
        other => return Err(format!("unknown duration unit '{other}' in '{s}'")),
    };
    Ok(d)
}
