use std::time::Duration;

use thiserror::Error;

/// Why a single job failed.
///
/// The display text is what ends up in the job's `Done` event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("exit status {code}")]
    NonZeroExit { code: i32 },
    #[error("killed by signal {signal}")]
    KilledBySignal { signal: i32 },
    #[error("terminated abnormally")]
    Terminated,
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
