use std::io;

use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Build the subscriber for `cfg` and make it the global default.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    if tracing::dispatcher::has_been_set() {
        return Err(LoggerError::AlreadyInitialized);
    }
    let filter = mk_filter(&cfg.filter)?;

    match cfg.format {
        LoggerFormat::Text => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(cfg.use_color)
                .with_target(cfg.with_targets)
                .with_timer(mk_timer(cfg));
            init_with(tracing_subscriber::registry().with(filter).with(layer))
        }
        LoggerFormat::Json => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(io::stderr)
                .with_ansi(false)
                .with_target(cfg.with_targets)
                .with_timer(mk_timer(cfg));
            init_with(tracing_subscriber::registry().with(filter).with(layer))
        }
        LoggerFormat::Journald => mk_journald(filter),
    }
}

/// Local UTC offset, falling back to UTC when it cannot be determined.
///
/// The lookup is only reliable while the process is single-threaded, so call this before starting
/// the async runtime and pass the result along.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn mk_filter(filter: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_new(filter).map_err(|e| LoggerError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

fn mk_timer(cfg: &LoggerConfig) -> OffsetTime<Rfc3339> {
    OffsetTime::new(cfg.utc_offset, Rfc3339)
}

fn init_with<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|e| LoggerError::InitializationFailed(e.to_string()))
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn mk_journald(filter: EnvFilter) -> Result<(), LoggerError> {
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?;
    init_with(tracing_subscriber::registry().with(filter).with(journald))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn mk_journald(_filter: EnvFilter) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
