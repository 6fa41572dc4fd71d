//! Turning an input stream into a bounded sequence of jobs.

mod record;
pub use record::{RecordReader, Separator, normalize};

mod template;
pub use template::{CommandTemplate, DEFAULT_PLACEHOLDER};

mod source;
pub use source::JobSource;

use tokio::{io::AsyncRead, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use prun_model::{CountUpdate, Job};

use crate::error::CoreError;

/// How often (in jobs) the running count is reported while input is still being read.
pub const REPORT_EVERY: u64 = 10;

/// Feeds jobs into the worker queue and reports counts on the side channel.
pub struct Dispatcher<R> {
    source: JobSource<R>,
}

impl<R: AsyncRead + Unpin> Dispatcher<R> {
    pub fn new(source: JobSource<R>) -> Self {
        Self { source }
    }

    /// Dispatch until input is exhausted, the workers are gone, or `cancel` fires.
    ///
    /// `CountUpdate::Total` is sent once, only when the input was read to its end (or a read
    /// error ended it). Both senders are dropped on return, which closes the channels.
    pub async fn run(
        mut self,
        jobs: mpsc::Sender<Job>,
        counts: mpsc::Sender<CountUpdate>,
        cancel: CancellationToken,
    ) -> Result<u64, CoreError> {
        let mut failure = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(target: "prun.core.dispatch", produced = self.source.produced(), "cancelled");
                    return Ok(self.source.produced());
                }
                next = self.source.next_job() => next,
            };

            let job = match next {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    error!(target: "prun.core.dispatch", error = %e, "input failed; no further jobs");
                    failure = Some(e);
                    break;
                }
            };
            let id = job.id;
            trace!(target: "prun.core.dispatch", id, tag = %job.tag, "dispatch");

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.source.produced()),
                sent = jobs.send(job) => sent.is_ok(),
            };
            if !sent {
                debug!(target: "prun.core.dispatch", id, "job queue closed");
                return Ok(self.source.produced());
            }

            if id % REPORT_EVERY == 0 {
                send_count(&counts, CountUpdate::Running(id), &cancel).await;
            }
        }
        drop(jobs);

        let total = self.source.produced();
        debug!(target: "prun.core.dispatch", total, "input exhausted");
        send_count(&counts, CountUpdate::Total(total), &cancel).await;

        match failure {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

async fn send_count(
    counts: &mpsc::Sender<CountUpdate>,
    update: CountUpdate,
    cancel: &CancellationToken,
) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = counts.send(update) => {}
    }
}
