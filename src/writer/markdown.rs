//! Markdown documentation writer
//!
//! Writes `README.md` for the application, `<module>/README.md` for each
//! module and `<schema id>.md` for each schema.

use super::Writer;
use super::context::{ApplicationContext, ModuleContext, SchemaContext};
use super::helpers::page_of;
use super::templates::{DefaultTemplates, Templates};
use crate::models::{DependencyGraph, Finding, Model};
use crate::storage::{self, StorageBackend};
use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info};

/// Writer rendering the model as Markdown pages
pub struct MarkdownWriter<B: StorageBackend, T: Templates = DefaultTemplates> {
    storage: B,
    output_dir: String,
    templates: T,
}

impl<B: StorageBackend> MarkdownWriter<B, DefaultTemplates> {
    pub fn new(storage: B, output_dir: impl Into<String>) -> Self {
        Self {
            storage,
            output_dir: output_dir.into(),
            templates: DefaultTemplates,
        }
    }
}

impl<B: StorageBackend, T: Templates> MarkdownWriter<B, T> {
    /// Render with another template set
    pub fn with_templates<U: Templates>(self, templates: U) -> MarkdownWriter<B, U> {
        MarkdownWriter {
            storage: self.storage,
            output_dir: self.output_dir,
            templates,
        }
    }

    async fn write_page(&self, relative: &str, content: &str) -> anyhow::Result<()> {
        let path = storage::join(&self.output_dir, relative);
        debug!(path = %path, "Writing page");
        self.storage
            .write_file(&path, content.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path))
    }
}

#[async_trait(?Send)]
impl<B: StorageBackend, T: Templates> Writer for MarkdownWriter<B, T> {
    fn name(&self) -> &str {
        "markdown"
    }

    async fn write(&self, model: &Model, findings: &[Finding]) -> anyhow::Result<()> {
        let graph = DependencyGraph::build(model);

        for handle in model.handles() {
            let context = SchemaContext::new(model, &graph, handle, findings);
            let page = self
                .templates
                .schema(&context)
                .with_context(|| format!("Failed to render {}", context.schema.id))?;
            self.write_page(&page_of(&context.schema.id), &page).await?;
        }

        for module in model.modules() {
            let context = ModuleContext::new(model, &graph, module, findings);
            let page = self
                .templates
                .module(&context)
                .with_context(|| format!("Failed to render {}", module.id))?;
            self.write_page(&format!("{}/README.md", module.id), &page).await?;
        }

        let context = ApplicationContext::new(model, &graph, findings);
        let page = self
            .templates
            .application(&context)
            .context("Failed to render the application page")?;
        self.write_page("README.md", &page).await?;

        info!(
            schemas = model.schemas().len(),
            modules = model.modules().len(),
            output = %self.output_dir,
            "Wrote Markdown documentation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FindingSubject, ImplementationErrorType};
    use crate::reader::{ReaderConfig, SourceFile, build_model};
    use crate::storage::memory::MemoryStorageBackend;
    use crate::writer::context::SchemaContext;
    use std::fmt;

    fn model() -> Model {
        build_model(
            vec![
                SourceFile::new("index.yaml", "title: Shop\ndescription: Online shop\n"),
                SourceFile::new("customers/index.yaml", "$id: /customers\ntitle: Customers\n"),
                SourceFile::new(
                    "customers/Customer.yaml",
                    "$id: /customers/Customer.yaml\ntitle: Customer\ndescription: A customer\ntype: object\nrequired: [name]\nproperties:\n  name:\n    type: string\n    description: |\n      Full name\n      as printed\n  status:\n    type: string\n    enum: [active, blocked]\n",
                ),
            ],
            &ReaderConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_writes_all_pages() {
        let model = model();
        let storage = MemoryStorageBackend::new();
        let writer = MarkdownWriter::new(storage.clone(), "docs");
        let handle = model.schema_by_id("/customers/Customer.yaml").unwrap();
        let findings = vec![Finding::new(
            FindingSubject::Schema(handle),
            ImplementationErrorType::MissingInImplementation,
            "status is not implemented",
        )];
        writer.write(&model, &findings).await.unwrap();

        assert_eq!(
            storage.paths(),
            vec!["docs/README.md", "docs/customers/Customer.yaml.md", "docs/customers/README.md"]
        );

        let page = storage.get("docs/customers/Customer.yaml.md").unwrap();
        assert!(page.starts_with("# Customer\n\nA customer\n"));
        assert!(page.contains("| name | string | yes | Full name<br>as printed |"));
        assert!(page.contains("| status | [CustomerStatus](#CustomerStatus) |  |  |"));
        assert!(page.contains("<a name=\"CustomerStatus\"></a>"));
        assert!(page.contains("- 1 validation error"));
        assert!(page.contains("| MISSING_IN_IMPLEMENTATION | status is not implemented |"));

        let module = storage.get("docs/customers/README.md").unwrap();
        assert!(module.contains("| [Customer](./Customer.yaml.md) | Entity | A customer |"));

        let application = storage.get("docs/README.md").unwrap();
        assert!(application.contains("| [Customers](./customers/README.md) |  |"));
    }

    struct TitleOnly;

    impl Templates for TitleOnly {
        fn application(&self, context: &ApplicationContext<'_>) -> Result<String, fmt::Error> {
            Ok(context.application.title.clone())
        }

        fn module(&self, context: &ModuleContext<'_>) -> Result<String, fmt::Error> {
            Ok(context.module.title.clone())
        }

        fn schema(&self, context: &SchemaContext<'_>) -> Result<String, fmt::Error> {
            Ok(context.schema.title.clone())
        }
    }

    #[tokio::test]
    async fn test_custom_templates() {
        let storage = MemoryStorageBackend::new();
        let writer = MarkdownWriter::new(storage.clone(), "").with_templates(TitleOnly);
        writer.write(&model(), &[]).await.unwrap();
        assert_eq!(storage.get("README.md").as_deref(), Some("Shop"));
        assert_eq!(storage.get("customers/Customer.yaml.md").as_deref(), Some("Customer"));
    }
}
