use std::{fmt, io, sync::Arc};

use tokio::process::Command;

/// Platform mechanism for isolating a job's processes and killing them as a unit.
pub trait ProcessTree: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Prepare `cmd` so the spawned process and every child it starts share a fresh group.
    fn isolate(&self, cmd: &mut Command);

    /// Forcefully terminate every process in the group led by `leader`.
    ///
    /// A group that is already gone is not an error.
    fn kill_tree(&self, leader: u32) -> io::Result<()>;
}

/// Mechanism for the host platform.
pub fn default_tree() -> Arc<dyn ProcessTree> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            Arc::new(PosixGroup)
        } else {
            Arc::new(LeaderOnly)
        }
    }
}

/// POSIX process groups: `setpgid(0, 0)` in the child, `kill(-pgid, SIGKILL)` to tear down.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixGroup;

#[cfg(unix)]
impl ProcessTree for PosixGroup {
    fn name(&self) -> &'static str {
        "posix-group"
    }

    fn isolate(&self, cmd: &mut Command) {
        cmd.process_group(0);
    }

    fn kill_tree(&self, leader: u32) -> io::Result<()> {
        let pgid = libc::pid_t::try_from(leader)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        if pgid <= 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to signal process group {pgid}"),
            ));
        }

        let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// Fallback without process groups: delegates tree termination to `taskkill /T`.
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaderOnly;

#[cfg(not(unix))]
impl ProcessTree for LeaderOnly {
    fn name(&self) -> &'static str {
        "leader-only"
    }

    fn isolate(&self, _cmd: &mut Command) {}

    fn kill_tree(&self, leader: u32) -> io::Result<()> {
        let status = std::process::Command::new("taskkill")
            .args(["/T", "/F", "/PID", &leader.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("taskkill exited with {status}")))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn refuses_reserved_group_ids() {
        let tree = PosixGroup;
        assert!(tree.kill_tree(0).is_err());
        assert!(tree.kill_tree(1).is_err());
    }

    #[tokio::test]
    async fn killing_a_finished_group_is_not_an_error() {
        let tree = PosixGroup;
        let mut cmd = Command::new("true");
        tree.isolate(&mut cmd);

        let mut child = cmd.spawn().expect("spawn true");
        let pid = child.id().expect("pid");
        child.wait().await.expect("wait");

        assert!(tree.kill_tree(pid).is_ok());
    }
}
