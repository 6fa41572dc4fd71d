use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use prun_model::Job;

use crate::error::ExecError;

/// Command for `job` with stdin detached and both output streams piped.
pub fn cmd_program(job: &Job) -> Command {
    let mut cmd = Command::new(&job.command);
    cmd.args(&job.args);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Map a process exit status to the job outcome.
pub fn check_status(status: ExitStatus) -> Result<(), ExecError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(ExecError::NonZeroExit { code });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(ExecError::KilledBySignal { signal });
        }
    }
    Err(ExecError::Terminated)
}

/// Decode one raw output line, dropping the line terminator.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"tail"), "tail");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn decode_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"a\xffb\n"), "a\u{fffd}b");
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_map_to_errors() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(check_status(ExitStatus::from_raw(0)), Ok(()));
        assert_eq!(
            check_status(ExitStatus::from_raw(3 << 8)),
            Err(ExecError::NonZeroExit { code: 3 })
        );
        assert_eq!(
            check_status(ExitStatus::from_raw(libc::SIGKILL)),
            Err(ExecError::KilledBySignal {
                signal: libc::SIGKILL
            })
        );
    }
}
