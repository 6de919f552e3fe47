//! Process-level failures and their exit codes

use std::fmt;

use strand_errors::{ErrorKind, UserFacingError};

#[derive(Debug)]
pub enum CliError {
    /// A pipeline error that ended the command
    Pipeline(strand_errors::Error),
    Usage(String),
}

impl CliError {
    /// Exit status reported to the supervisor
    ///
    /// A halted stream gets its own status so that a restart loop can tell
    /// it apart from failures that go away on their own.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Pipeline(e) => match e.kind() {
                ErrorKind::ChainBreak => 3,
                ErrorKind::Config | ErrorKind::InvalidArgument => 78,
                ErrorKind::Cancelled => 130,
                _ => 1,
            },
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Pipeline(e) => {
                if e.kind() == ErrorKind::ChainBreak {
                    f.write_str("stream halted: ")?;
                }
                write!(f, "{}", e.user_message())?;
                if let Some(code) = e.user_code() {
                    write!(f, " [{code}]")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  hint: {hint}")?;
                }
                if e.is_retryable() {
                    f.write_str("\n  the next run may succeed")?;
                }
                Ok(())
            }
            CliError::Usage(msg) => write!(f, "usage: {msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Pipeline(e) => Some(e),
            CliError::Usage(_) => None,
        }
    }
}

impl From<strand_errors::Error> for CliError {
    fn from(e: strand_errors::Error) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<strand_errors::ConfigError> for CliError {
    fn from(e: strand_errors::ConfigError) -> Self {
        CliError::Pipeline(e.into())
    }
}

impl From<strand_errors::ParseError> for CliError {
    fn from(e: strand_errors::ParseError) -> Self {
        CliError::Pipeline(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_errors::{ChainError, ConfigError, ProviderError};

    #[test]
    fn test_chain_break_has_its_own_exit_code() {
        let err = CliError::from(strand_errors::Error::from(ChainError::Broken {
            filename: "b".into(),
            last_filename: "a".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        }));
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("stream halted: "));
    }

    #[test]
    fn test_config_and_usage_codes() {
        let err = CliError::from(ConfigError::MissingField {
            field: "nodes".into(),
        });
        assert_eq!(err.exit_code(), 78);
        assert_eq!(CliError::Usage("bad".into()).exit_code(), 2);
    }

    #[test]
    fn test_retryable_errors_say_so() {
        let err = CliError::from(strand_errors::Error::from(ProviderError::transient(
            "0.0.3", "f", "gcs", "reset",
        )));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("the next run may succeed"));
    }
}
