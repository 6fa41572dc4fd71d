mod job;
pub use job::Job;

mod event;
pub use event::{EventKind, StatusEvent, Stream};

mod count;
pub use count::CountUpdate;

/// Ordinal of a job, assigned at read time.
///
/// Starts at 1 and increases by one for every non-blank input record.
pub type JobId = u64;

/// Display key of a job: the trimmed input record it was built from.
pub type Tag = String;
