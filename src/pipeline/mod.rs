//! Pipeline orchestration
//!
//! A run reads the input into a model, optionally cleans the output
//! directory, runs plugins and then writers:
//! 1. read (parse, resolve, reconcile, validate, assemble)
//! 2. clean (optional)
//! 3. plugins, in order
//! 4. writers, in order

pub mod config;
pub mod error;
pub mod executor;

pub use config::{PipelineStage, RunConfig};
pub use error::{PipelineError, PipelineResult};
pub use executor::{OutputCleaning, Pipeline, RunOptions, RunReport, run};
