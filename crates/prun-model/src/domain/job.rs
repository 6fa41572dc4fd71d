use std::ffi::OsString;

use crate::{JobId, Tag};

/// One invocation of the external command.
///
/// Built by the dispatcher from a single input record and never mutated afterwards.
/// Ownership moves from the dispatcher to exactly one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    /// 1-based ordinal.
    pub id: JobId,
    /// Echo of the input record; used as display key and log prefix.
    ///
    /// Decoded lossily, so it may differ from the bytes in `command` and `args`.
    pub tag: Tag,
    /// Program to execute, placeholder already substituted.
    pub command: OsString,
    /// Arguments in order, placeholder already substituted.
    pub args: Vec<OsString>,
}

impl Job {
    pub fn new(
        id: JobId,
        tag: impl Into<Tag>,
        command: impl Into<OsString>,
        args: Vec<OsString>,
    ) -> Self {
        Self {
            id,
            tag: tag.into(),
            command: command.into(),
            args,
        }
    }
}
