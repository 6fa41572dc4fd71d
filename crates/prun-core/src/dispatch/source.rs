use tokio::io::AsyncRead;
use tracing::warn;

use prun_model::{Job, JobId};

use crate::{
    dispatch::{
        record::{RecordReader, Separator, normalize},
        template::CommandTemplate,
    },
    error::CoreError,
};

/// Lazy, in-order sequence of jobs read from an input stream.
pub struct JobSource<R> {
    records: RecordReader<R>,
    template: CommandTemplate,
    next_id: JobId,
}

impl<R: AsyncRead + Unpin> JobSource<R> {
    pub fn new(input: R, sep: Separator, template: CommandTemplate) -> Self {
        Self {
            records: RecordReader::new(input, sep),
            template,
            next_id: 1,
        }
    }

    /// Number of jobs produced so far.
    pub fn produced(&self) -> u64 {
        self.next_id - 1
    }

    /// Next job, skipping blank records; `None` once input is exhausted.
    pub async fn next_job(&mut self) -> Result<Option<Job>, CoreError> {
        loop {
            let Some(record) = self.records.next_record().await? else {
                return Ok(None);
            };
            let Some(item) = normalize(&record) else {
                warn!(target: "prun.core.dispatch", "ignoring empty item");
                continue;
            };

            let (command, args) = self.template.render(item);
            let tag = String::from_utf8_lossy(item);
            let job = Job::new(self.next_id, tag, command, args);
            self.next_id += 1;
            return Ok(Some(job));
        }
    }
}
