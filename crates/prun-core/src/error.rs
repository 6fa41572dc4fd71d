use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no command given")]
    NoCommand,

    #[error("placeholder {0:?} not found in command or arguments")]
    PlaceholderMissing(String),

    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),

    #[error("task failed: {0}")]
    Join(String),
}

impl CoreError {
    /// Returns `true` for errors detected before any job starts.
    pub fn is_config(&self) -> bool {
        matches!(self, CoreError::NoCommand | CoreError::PlaceholderMissing(_))
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::NoCommand => 1,
            CoreError::PlaceholderMissing(_) => 2,
            CoreError::Input(_) | CoreError::Join(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_have_distinct_exit_codes() {
        let no_cmd = CoreError::NoCommand;
        let no_placeholder = CoreError::PlaceholderMissing("{}".into());

        assert!(no_cmd.is_config());
        assert!(no_placeholder.is_config());
        assert_ne!(no_cmd.exit_code(), no_placeholder.exit_code());
        assert_ne!(no_cmd.exit_code(), 0);
        assert_eq!(
            no_placeholder.to_string(),
            "placeholder \"{}\" not found in command or arguments"
        );
    }
}
