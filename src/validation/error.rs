//! Located validation errors
//!
//! Every problem found while reading the input is a `ValidationError` with
//! a kind, a message naming the offending identifier and the source
//! location. Errors are collected into `ValidationErrors` so a single run
//! reports everything it found.

use crate::models::SourceLocation;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Category of a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedInput,
    UnresolvedReference,
    DiscriminatorViolation,
    ConstraintViolation,
    DuplicateId,
    CyclicReference,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MalformedInput => "malformed input",
            Self::UnresolvedReference => "unresolved reference",
            Self::DiscriminatorViolation => "discriminator violation",
            Self::ConstraintViolation => "constraint violation",
            Self::DuplicateId => "duplicate id",
            Self::CyclicReference => "cyclic reference",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single located problem in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{location}: {kind}: {message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
            suggestion: None,
        }
    }

    pub fn malformed(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::MalformedInput, message, location)
    }

    pub fn unresolved(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::UnresolvedReference, message, location)
    }

    pub fn discriminator(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::DiscriminatorViolation, message, location)
    }

    pub fn constraint(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(ErrorKind::ConstraintViolation, message, location)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Message with the location, plus a hint line when a suggestion exists
    pub fn user_message(&self) -> String {
        match &self.suggestion {
            Some(suggestion) => format!("{}\n  Hint: did you mean '{}'?", self, suggestion),
            None => self.to_string(),
        }
    }
}

/// All validation errors of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("{} validation error(s): {}", .0.len(), .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.0.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Number of errors of a kind
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.0.iter().filter(|e| e.kind == kind).count()
    }

    /// Sort by file, line and column; the sort is stable for equal locations
    pub fn sorted(mut self) -> Self {
        self.0.sort_by(|a, b| a.location.cmp(&b.location));
        self
    }

    /// `Ok(())` when empty, the sorted errors otherwise
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.sorted())
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
