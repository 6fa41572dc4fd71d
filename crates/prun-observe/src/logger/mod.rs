mod config;
mod error;
mod format;
mod log;

pub use config::{DEFAULT_FILTER, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use log::local_offset;

/// Install the global diagnostic subscriber described by `cfg`.
///
/// Diagnostics always go to stderr; stdout belongs to the status aggregator.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}
