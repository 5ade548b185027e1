//! Plugins
//!
//! A plugin may enrich the model, verify it against an implementation and
//! generate its own artifacts. Plugins run one after another in the order
//! they were configured; every hook of one plugin completes before the next
//! plugin starts.

pub mod openapi;

pub use openapi::{OpenApiOptions, OpenApiPlugin};

use crate::models::{Finding, Model};
use async_trait::async_trait;

/// A model transformer
///
/// All hooks default to doing nothing.
#[async_trait(?Send)]
pub trait Plugin {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Mutate the model, e.g. add links or tags
    async fn update_model(&self, _model: &mut Model) -> anyhow::Result<()> {
        Ok(())
    }

    /// Compare the model with an implementation
    async fn validate(&self, _model: &Model) -> anyhow::Result<Vec<Finding>> {
        Ok(Vec::new())
    }

    /// Write generated artifacts
    async fn generate_output(&self, _model: &Model) -> anyhow::Result<()> {
        Ok(())
    }
}
