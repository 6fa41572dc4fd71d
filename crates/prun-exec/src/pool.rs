//! Fixed-size pool of workers sharing one job queue.
use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use prun_model::{Job, StatusEvent};

use crate::{
    error::ExecError,
    proc::{JobRunner, ProcessTree, default_tree},
};

#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of jobs running at the same time. Clamped to at least one.
    pub workers: usize,
    /// Per-job deadline; `None` runs jobs without a limit.
    pub timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: host_parallelism(),
            timeout: None,
        }
    }
}

/// Number of CPUs available to this process, or 1 when unknown.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

pub struct WorkerPool {
    cfg: PoolConfig,
    tree: Arc<dyn ProcessTree>,
}

impl WorkerPool {
    pub fn new(cfg: PoolConfig) -> Self {
        Self {
            cfg,
            tree: default_tree(),
        }
    }

    pub fn with_tree(mut self, tree: Arc<dyn ProcessTree>) -> Self {
        self.tree = tree;
        self
    }

    pub fn workers(&self) -> usize {
        self.cfg.workers.max(1)
    }

    /// Run workers until the job queue is closed and drained, or `cancel` fires.
    ///
    /// Each job gets exactly one `Start` and one `Done` event. Returns the number of jobs that
    /// reached `Done`.
    pub async fn run(
        self,
        jobs: mpsc::Receiver<Job>,
        events: mpsc::Sender<StatusEvent>,
        cancel: CancellationToken,
    ) -> u64 {
        let workers = self.workers();
        let runner = JobRunner::new(self.tree, self.cfg.timeout);
        let queue: SharedQueue = Arc::new(Mutex::new(jobs));

        info!(target: "prun.exec.pool", workers, timeout = ?runner.timeout(), "starting workers");

        let mut set = JoinSet::new();
        for slot in 0..workers {
            set.spawn(worker(
                slot,
                Arc::clone(&queue),
                runner.clone(),
                events.clone(),
                cancel.clone(),
            ));
        }
        drop(events);

        let mut completed = 0;
        while let Some(res) = set.join_next().await {
            match res {
                Ok(n) => completed += n,
                Err(e) => error!(target: "prun.exec.pool", error = %e, "worker task failed"),
            }
        }
        debug!(target: "prun.exec.pool", completed, "all workers finished");
        completed
    }
}

async fn worker(
    slot: usize,
    queue: SharedQueue,
    runner: JobRunner,
    events: mpsc::Sender<StatusEvent>,
    cancel: CancellationToken,
) -> u64 {
    let mut completed = 0;

    while let Some(job) = next_job(&queue, &cancel).await {
        trace!(target: "prun.exec.pool", slot, id = job.id, tag = %job.tag, "picked job");
        let _ = events.send(StatusEvent::start(&job)).await;

        let error = execute(&runner, &job, &events, &cancel)
            .await
            .err()
            .map(|e| e.to_string());

        if let Some(reason) = &error {
            debug!(target: "prun.exec.pool", slot, id = job.id, %reason, "job failed");
        }
        let _ = events.send(StatusEvent::done(&job, error)).await;
        completed += 1;
    }

    trace!(target: "prun.exec.pool", slot, completed, "worker exiting");
    completed
}

/// Dequeue the next job; `None` once the queue is closed or the run is cancelled.
async fn next_job(queue: &SharedQueue, cancel: &CancellationToken) -> Option<Job> {
    let mut rx = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        rx = queue.lock() => rx,
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        job = rx.recv() => job,
    }
}

/// Run `job` on its own task so a panic fails this job only.
async fn execute(
    runner: &JobRunner,
    job: &Job,
    events: &mpsc::Sender<StatusEvent>,
    cancel: &CancellationToken,
) -> Result<(), ExecError> {
    let runner = runner.clone();
    let job = job.clone();
    let events = events.clone();
    let cancel = cancel.clone();

    let handle = tokio::spawn(async move { runner.run(&job, &events, &cancel).await });
    match handle.await {
        Ok(res) => res,
        Err(e) if e.is_panic() => Err(ExecError::Panicked(panic_message(e.into_panic()))),
        Err(_) => Err(ExecError::Cancelled),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
