//! Writers
//!
//! Writers render the final model, read-only, together with the findings of
//! all plugins. They run after every plugin has finished.

pub mod context;
pub mod helpers;
pub mod markdown;
pub mod templates;

pub use context::{ApplicationContext, ModuleContext, SchemaContext};
pub use markdown::MarkdownWriter;
pub use templates::{DefaultTemplates, Templates};

use crate::models::{Finding, Model};
use async_trait::async_trait;

/// A model renderer
#[async_trait(?Send)]
pub trait Writer {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    async fn write(&self, model: &Model, findings: &[Finding]) -> anyhow::Result<()>;
}
