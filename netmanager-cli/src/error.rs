//! CLI error type and process exit codes.

use netmanager::{ConfigError, NetworkError};
use thiserror::Error;

/// Exit code for malformed command-line input.
pub const EXIT_USAGE: i32 = 64;

/// Exit code for local I/O failures such as writing the output file.
pub const EXIT_IO: i32 = 74;

/// Exit code for configuration problems.
pub const EXIT_CONFIG: i32 = 78;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Network(#[from] NetworkError),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Network failures exit with their network error code, so scripts can
    /// tell a timeout (3) from an HTTP error status (4).
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => EXIT_USAGE,
            CliError::Config(_) => EXIT_CONFIG,
            CliError::Io { .. } => EXIT_IO,
            CliError::Network(e) => e.code().value() as i32,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CliError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
