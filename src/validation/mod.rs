//! Validation functionality
//!
//! Provides:
//! - Located validation errors
//! - The format and keyword registry
//! - Structural, reference and example checks

pub mod error;
pub mod formats;
pub mod instance;
pub mod rules;
pub mod suggest;

pub use error::{ErrorKind, ValidationError, ValidationErrors};
pub use formats::{FormatCheck, FormatRegistry, KeywordContext, KeywordHandler};
pub use instance::InstanceValidator;
pub use rules::Validator;
