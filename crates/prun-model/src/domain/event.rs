use crate::{Job, JobId, Tag};

/// Standard stream a line of job output was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    #[inline]
    pub fn is_stderr(&self) -> bool {
        matches!(self, Stream::Stderr)
    }
}

/// What happened to a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The worker picked the job up; always the first event of a job.
    Start,
    /// One line of output, without its line terminator.
    Output { line: String, stream: Stream },
    /// Terminal event, emitted exactly once after all output of the job.
    ///
    /// `error` is `None` on success and carries the failure text otherwise.
    Done { error: Option<String> },
}

/// Status message produced by a worker and consumed by the status aggregator.
///
/// Ordering is guaranteed per job only: `Start`, then any `Output`, then `Done`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEvent {
    pub id: JobId,
    pub tag: Tag,
    pub kind: EventKind,
}

impl StatusEvent {
    pub fn start(job: &Job) -> Self {
        Self::with_kind(job, EventKind::Start)
    }

    pub fn output(job: &Job, line: impl Into<String>, stream: Stream) -> Self {
        Self::with_kind(
            job,
            EventKind::Output {
                line: line.into(),
                stream,
            },
        )
    }

    pub fn done(job: &Job, error: Option<String>) -> Self {
        Self::with_kind(job, EventKind::Done { error })
    }

    fn with_kind(job: &Job, kind: EventKind) -> Self {
        Self {
            id: job.id,
            tag: job.tag.clone(),
            kind,
        }
    }

    /// Returns `true` for the terminal `Done` event.
    pub fn is_done(&self) -> bool {
        matches!(self.kind, EventKind::Done { .. })
    }
}
