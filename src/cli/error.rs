//! CLI error type

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Errors reported by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to start the async runtime: {0}")]
    Runtime(String),
}

impl CliError {
    /// Message printed before exiting
    pub fn user_message(&self) -> String {
        match self {
            Self::Pipeline(e) => e.user_message(),
            Self::InvalidArgument(msg) => {
                format!("Invalid argument: {msg}\n\nHint: Run with --help to see the available options.")
            }
            other => other.to_string(),
        }
    }
}
