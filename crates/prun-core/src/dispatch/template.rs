use std::ffi::OsString;

use crate::error::CoreError;

pub const DEFAULT_PLACEHOLDER: &str = "{}";

/// Command line with a placeholder token that is replaced by each input record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
    placeholder: String,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    /// Build from a full argv: first element is the program.
    pub fn from_argv(argv: Vec<String>) -> Result<Self, CoreError> {
        let mut iter = argv.into_iter();
        let program = iter.next().ok_or(CoreError::NoCommand)?;
        Ok(Self::new(program, iter.collect()))
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Fail fast unless the command is usable: a non-empty program and at least one placeholder.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.program.is_empty() {
            return Err(CoreError::NoCommand);
        }
        let found = !self.placeholder.is_empty()
            && std::iter::once(&self.program)
                .chain(self.args.iter())
                .any(|part| part.contains(&self.placeholder));
        if found {
            Ok(())
        } else {
            Err(CoreError::PlaceholderMissing(self.placeholder.clone()))
        }
    }

    /// Program and arguments with every placeholder occurrence replaced by `record`.
    ///
    /// Substitution works on bytes, so records that are not valid UTF-8 reach the process as is.
    pub fn render(&self, record: &[u8]) -> (OsString, Vec<OsString>) {
        let needle = self.placeholder.as_bytes();
        let sub = |s: &String| os_from_bytes(replace_bytes(s.as_bytes(), needle, record));
        (sub(&self.program), self.args.iter().map(sub).collect())
    }
}

/// Non-overlapping, left-to-right replacement of every `from` in `haystack`.
fn replace_bytes(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(at) = rest.windows(from.len()).position(|w| w == from) {
        out.extend_from_slice(&rest[..at]);
        out.extend_from_slice(to);
        rest = &rest[at + from.len()..];
    }
    out.extend_from_slice(rest);
    out
}

#[cfg(unix)]
fn os_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

#[cfg(not(unix))]
fn os_from_bytes(bytes: Vec<u8>) -> OsString {
    OsString::from(String::from_utf8_lossy(&bytes).into_owned())
}
