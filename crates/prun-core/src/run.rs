use std::time::Duration;

use tokio::{io::AsyncRead, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use prun_exec::{PoolConfig, WorkerPool};

use crate::{
    dispatch::{CommandTemplate, Dispatcher, JobSource, Separator},
    error::CoreError,
    status::{DisplayOptions, StatusAggregator, Summary},
    term::Console,
};

const EVENT_BUFFER: usize = 1024;
const COUNT_BUFFER: usize = 16;

/// Everything one run needs besides its input and output.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub procs: usize,
    /// Per-job deadline; `None` for unlimited.
    pub timeout: Option<Duration>,
    pub template: CommandTemplate,
    pub separator: Separator,
    pub display: DisplayOptions,
}

/// Run every record of `input` through the command template and report on `console`.
///
/// Configuration errors are returned before any job starts. Job failures only show up in the
/// returned [`Summary`].
pub async fn run<R, C>(
    cfg: RunConfig,
    input: R,
    console: C,
    cancel: CancellationToken,
) -> Result<Summary, CoreError>
where
    R: AsyncRead + Unpin + Send + 'static,
    C: Console + 'static,
{
    cfg.template.validate()?;

    let pool = WorkerPool::new(PoolConfig {
        workers: cfg.procs,
        timeout: cfg.timeout,
    });
    let workers = pool.workers();

    let (job_tx, job_rx) = mpsc::channel(workers);
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let (count_tx, count_rx) = mpsc::channel(COUNT_BUFFER);

    info!(
        target: "prun.core.run",
        workers,
        program = cfg.template.program(),
        timeout = ?cfg.timeout,
        "run starting"
    );

    let aggregator = StatusAggregator::new(console, workers, cfg.display);
    let status = tokio::spawn(aggregator.run(event_rx, count_rx, cancel.clone()));

    let source = JobSource::new(input, cfg.separator, cfg.template);
    let dispatch = tokio::spawn(Dispatcher::new(source).run(job_tx, count_tx, cancel.clone()));

    let completed = pool.run(job_rx, event_tx, cancel.clone()).await;

    match dispatch.await {
        Ok(Ok(produced)) if produced != completed && !cancel.is_cancelled() => {
            warn!(target: "prun.core.run", produced, completed, "not every job completed");
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(target: "prun.core.run", error = %e, "input ended early"),
        Err(e) => error!(target: "prun.core.run", error = %e, "dispatcher task failed"),
    }

    let summary = status.await.map_err(|e| CoreError::Join(e.to_string()))?;
    info!(
        target: "prun.core.run",
        processed = summary.processed,
        failed = summary.failed,
        interrupted = summary.interrupted,
        "run finished"
    );
    Ok(summary)
}
