use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use prun_model::{Job, StatusEvent, Stream};

use crate::{
    error::ExecError,
    proc::tree::ProcessTree,
    util::{check_status, cmd_program, decode_line},
};

/// How long to wait for a killed group's pipes to drain before giving up on them.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Runs a single job to completion.
///
/// Output lines are sent as [`StatusEvent`]s while the process runs. The returned future resolves
/// only after both output streams reached end-of-stream, so a caller emitting `Done` afterwards
/// never races an output line of the same job.
#[derive(Clone, Debug)]
pub struct JobRunner {
    tree: Arc<dyn ProcessTree>,
    timeout: Option<Duration>,
}

impl JobRunner {
    /// `timeout` of `None` (or zero) means the job may run forever.
    pub fn new(tree: Arc<dyn ProcessTree>, timeout: Option<Duration>) -> Self {
        Self {
            tree,
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn run(
        &self,
        job: &Job,
        events: &mpsc::Sender<StatusEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), ExecError> {
        if job.command.is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let mut cmd = cmd_program(job);
        self.tree.isolate(&mut cmd);

        trace!(target: "prun.exec.proc", id = job.id, program = ?job.command, args = ?job.args, "spawn");
        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
        let leader = child.id();
        let mut guard = GroupGuard {
            tree: self.tree.as_ref(),
            leader,
        };

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Io("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecError::Io("stderr not captured".into()))?;

        let finished = async {
            let (status, _, _) = tokio::join!(
                child.wait(),
                pump(stdout, Stream::Stdout, job, events),
                pump(stderr, Stream::Stderr, job, events),
            );
            status
        };
        tokio::pin!(finished);

        let deadline = async {
            match self.timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let interrupted = tokio::select! {
            status = &mut finished => {
                guard.disarm();
                let status = status?;
                debug!(target: "prun.exec.proc", id = job.id, %status, "exited");
                return check_status(status);
            }
            _ = &mut deadline => {
                debug!(target: "prun.exec.proc", id = job.id, timeout = ?self.timeout, "deadline hit; killing process group");
                ExecError::Timeout(self.timeout.unwrap_or_default())
            }
            _ = cancel.cancelled() => {
                debug!(target: "prun.exec.proc", id = job.id, "cancelled; killing process group");
                ExecError::Cancelled
            }
        };

        guard.kill();
        if tokio::time::timeout(KILL_GRACE, &mut finished).await.is_err() {
            warn!(target: "prun.exec.proc", id = job.id, "output still open after kill; abandoning streams");
        }
        Err(interrupted)
    }
}

/// Kills the job's process group when dropped while armed, so a panicking job leaves nothing behind.
struct GroupGuard<'a> {
    tree: &'a dyn ProcessTree,
    leader: Option<u32>,
}

impl GroupGuard<'_> {
    fn disarm(&mut self) {
        self.leader = None;
    }

    fn kill(&mut self) {
        if let Some(leader) = self.leader.take()
            && let Err(e) = self.tree.kill_tree(leader)
        {
            warn!(target: "prun.exec.proc", leader, tree = self.tree.name(), error = %e, "failed to kill process group");
        }
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Forward every line of `reader` as an output event until end-of-stream.
///
/// Read errors end the stream. Lines keep being drained after the receiver is gone so the child
/// never blocks on a full pipe.
async fn pump<R>(reader: R, stream: Stream, job: &Job, events: &mpsc::Sender<StatusEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut open = true;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if open {
                    let ev = StatusEvent::output(job, decode_line(&buf), stream);
                    open = events.send(ev).await.is_ok();
                }
            }
            Err(e) => {
                debug!(target: "prun.exec.proc", id = job.id, ?stream, error = %e, "read failed; treating as end of stream");
                break;
            }
        }
    }
}
