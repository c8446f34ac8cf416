//! Error types for the scheduler client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when driving the scheduler tools
#[derive(Debug, Error)]
pub enum ClientError {
    /// A scheduler command could not be launched at all
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// The command that failed to start
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The submission command finished without printing a usable job id
    #[error("{command} did not return a valid job ID")]
    NoJobId {
        /// The submission command that was run
        command: String,
    },

    /// Forwarding the submission output to stdout failed
    #[error("failed to forward submission output: {0}")]
    Passthrough(#[from] std::io::Error),
}

impl ClientError {
    /// Create a spawn error for a command
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source,
        }
    }

    /// Check if this is the fatal submission-parse failure
    pub fn is_submission_parse(&self) -> bool {
        matches!(self, Self::NoJobId { .. })
    }
}
