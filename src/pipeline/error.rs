//! Error types for pipeline runs
//!
//! Errors chain their sources for debugging and offer user-friendly
//! messages for CLI output.

use crate::reader::ReadError;
use crate::storage::StorageError;
use crate::validation::ValidationErrors;
use thiserror::Error;

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Run configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The input did not parse, resolve or validate
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Storage failure outside of plugins and writers
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A plugin hook failed
    #[error("Plugin '{plugin}' failed: {source}")]
    PluginFailure {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    /// A writer failed
    #[error("Writer '{writer}' failed: {source}")]
    WriterFailure {
        writer: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<ReadError> for PipelineError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Validation(errors) => Self::Validation(errors),
            ReadError::Storage(e) => Self::Storage(e),
            ReadError::Config(message) => Self::ConfigError(message),
        }
    }
}

impl PipelineError {
    pub fn plugin(plugin: impl Into<String>, source: anyhow::Error) -> Self {
        Self::PluginFailure {
            plugin: plugin.into(),
            source,
        }
    }

    pub fn writer(writer: impl Into<String>, source: anyhow::Error) -> Self {
        Self::WriterFailure {
            writer: writer.into(),
            source,
        }
    }

    /// Validation errors, if the input was rejected
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigError(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your configuration file and flags.")
            }
            Self::Validation(errors) => {
                let mut out = format!("The input model has {} error(s):\n", errors.len());
                for error in errors.iter() {
                    out.push('\n');
                    out.push_str(&error.user_message());
                }
                out
            }
            Self::Storage(StorageError::DirectoryNotFound(dir)) => {
                format!(
                    "Directory not found: {dir}\n\nHint: Check that the input directory exists and the path is correct."
                )
            }
            Self::PluginFailure { plugin, source } => {
                format!("Plugin '{plugin}' failed: {source:#}")
            }
            Self::WriterFailure { writer, source } => {
                format!(
                    "Writer '{writer}' failed: {source:#}\n\nHint: Check that the output directory is writable."
                )
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceLocation;
    use crate::validation::ValidationError;

    #[test]
    fn test_error_display() {
        let err = PipelineError::plugin("openapi", anyhow::anyhow!("disk full"));
        assert!(err.to_string().contains("openapi"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_read_error() {
        let errors = ValidationErrors::from(ValidationError::malformed(
            "Invalid YAML",
            SourceLocation::new("m/A.yaml", 2, 3),
        ));
        let err = PipelineError::from(ReadError::Validation(errors));
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));

        let err = PipelineError::from(ReadError::Config("bad".to_string()));
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }

    #[test]
    fn test_user_message() {
        let errors = ValidationErrors::from(
            ValidationError::malformed("Unknown keyword 'titel'", SourceLocation::new("m/A.yaml", 1, 1))
                .with_suggestion("title"),
        );
        let msg = PipelineError::Validation(errors).user_message();
        assert!(msg.contains("1 error(s)"));
        assert!(msg.contains("m/A.yaml:1:1"));
        assert!(msg.contains("Hint:"));

        let msg = PipelineError::Storage(StorageError::DirectoryNotFound("input".to_string())).user_message();
        assert!(msg.contains("Hint:"));
    }
}
