//! Pipeline executor
//!
//! Runs the reader, then every plugin, then every writer. Nothing is
//! written unless the model was read without errors.

use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::config::PipelineStage;
use super::error::{PipelineError, PipelineResult};
use crate::models::{Finding, Model};
use crate::plugin::Plugin;
use crate::reader::Reader;
use crate::storage::StorageBackend;
use crate::writer::Writer;

/// Output directory removed before writing and after a failed stage
pub struct OutputCleaning {
    pub storage: Box<dyn StorageBackend>,
    pub dir: String,
}

impl OutputCleaning {
    pub fn new(storage: impl StorageBackend + 'static, dir: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            dir: dir.into(),
        }
    }
}

/// Everything a run needs
pub struct RunOptions {
    pub reader: Box<dyn Reader>,
    /// Plugins in execution order
    pub plugins: Vec<Box<dyn Plugin>>,
    /// Writers in execution order
    pub writers: Vec<Box<dyn Writer>>,
    pub clean_output: Option<OutputCleaning>,
}

impl RunOptions {
    pub fn new(reader: impl Reader + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            plugins: Vec::new(),
            writers: Vec::new(),
            clean_output: None,
        }
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_writer(mut self, writer: impl Writer + 'static) -> Self {
        self.writers.push(Box::new(writer));
        self
    }

    pub fn with_clean_output(mut self, cleaning: OutputCleaning) -> Self {
        self.clean_output = Some(cleaning);
        self
    }

    /// Options for a file system run described by a configuration
    ///
    /// Reads from `config.input` and writes Markdown (and OpenAPI when
    /// enabled) below `config.output`.
    #[cfg(feature = "native-fs")]
    pub fn from_config(config: &super::config::RunConfig) -> PipelineResult<Self> {
        use crate::plugin::{OpenApiOptions, OpenApiPlugin};
        use crate::reader::DefaultReader;
        use crate::storage::filesystem::FileSystemStorageBackend;
        use crate::writer::MarkdownWriter;

        let reader_config = config.reader_config()?;
        let output = || FileSystemStorageBackend::new(&config.output);

        let reader = DefaultReader::new(FileSystemStorageBackend::new(&config.input), "")
            .with_config(reader_config);
        let mut options = Self::new(reader);
        if config.openapi.enabled {
            let plugin = OpenApiPlugin::new(output(), "").with_options(OpenApiOptions {
                servers: config.openapi.servers.clone(),
                link_path: config.openapi.link_path.clone(),
                ..OpenApiOptions::default()
            });
            options = options.with_plugin(plugin);
        }
        if config.markdown.enabled {
            options = options.with_writer(MarkdownWriter::new(output(), ""));
        }
        if config.clean_output {
            options = options.with_clean_output(OutputCleaning::new(output(), ""));
        }
        Ok(options)
    }
}

/// Result of a successful run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub schemas: usize,
    pub modules: usize,
    /// Findings of all plugins, in plugin order
    pub findings: Vec<Finding>,
    pub stages_completed: Vec<PipelineStage>,
    pub duration_ms: u64,
    /// The model as the writers saw it
    #[serde(skip)]
    pub model: Model,
}

/// A configured pipeline run
pub struct Pipeline {
    options: RunOptions,
    run_id: String,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run all stages
    pub async fn run(self) -> PipelineResult<RunReport> {
        let span = info_span!("pipeline_run", run_id = %self.run_id);
        self.execute().instrument(span).await
    }

    async fn execute(self) -> PipelineResult<RunReport> {
        let start = Instant::now();
        let Pipeline { options, run_id } = self;
        let RunOptions {
            reader,
            plugins,
            writers,
            clean_output,
        } = options;
        info!(
            run_id = %run_id,
            plugins = plugins.len(),
            writers = writers.len(),
            clean_output = clean_output.is_some(),
            "Starting pipeline"
        );

        let mut stages_completed = Vec::new();
        let mut model = run_stage(PipelineStage::Read, async {
            reader.read().await.map_err(PipelineError::from)
        })
        .await?;
        stages_completed.push(PipelineStage::Read);

        if let Some(cleaning) = &clean_output {
            run_stage(PipelineStage::Clean, async {
                cleaning.storage.delete_dir(&cleaning.dir).await?;
                cleaning.storage.create_dir(&cleaning.dir).await?;
                Ok::<_, PipelineError>(())
            })
            .await?;
            stages_completed.push(PipelineStage::Clean);
        }

        let output = generate(&plugins, &writers, &mut model, &mut stages_completed).await;
        let findings = match output {
            Ok(findings) => findings,
            Err(e) => {
                if let Some(cleaning) = &clean_output {
                    discard_output(cleaning).await;
                }
                return Err(e);
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            duration_ms,
            findings = findings.len(),
            stages_completed = stages_completed.len(),
            "Pipeline completed"
        );
        Ok(RunReport {
            run_id,
            schemas: model.schemas().len(),
            modules: model.modules().len(),
            findings,
            stages_completed,
            duration_ms,
            model,
        })
    }
}

/// Run a pipeline
pub async fn run(options: RunOptions) -> PipelineResult<RunReport> {
    Pipeline::new(options).run().await
}

async fn run_stage<T>(
    stage: PipelineStage,
    work: impl Future<Output = PipelineResult<T>>,
) -> PipelineResult<T> {
    let span = info_span!("pipeline_stage", stage = stage.name());
    async move {
        let start = Instant::now();
        info!(stage = stage.name(), "Starting stage");
        match work.await {
            Ok(value) => {
                info!(
                    stage = stage.name(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Stage completed"
                );
                Ok(value)
            }
            Err(e) => {
                error!(stage = stage.name(), error = %e, "Stage failed");
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Plugin and writer stages
async fn generate(
    plugins: &[Box<dyn Plugin>],
    writers: &[Box<dyn Writer>],
    model: &mut Model,
    stages_completed: &mut Vec<PipelineStage>,
) -> PipelineResult<Vec<Finding>> {
    let findings = run_stage(PipelineStage::Plugins, async {
        let mut findings = Vec::new();
        for plugin in plugins {
            let name = plugin.name();
            plugin
                .update_model(model)
                .await
                .map_err(|e| PipelineError::plugin(name, e))?;
            let found = plugin
                .validate(model)
                .await
                .map_err(|e| PipelineError::plugin(name, e))?;
            plugin
                .generate_output(model)
                .await
                .map_err(|e| PipelineError::plugin(name, e))?;
            debug!(plugin = name, findings = found.len(), "Plugin completed");
            findings.extend(found);
        }
        Ok::<_, PipelineError>(findings)
    })
    .await?;
    stages_completed.push(PipelineStage::Plugins);

    let model: &Model = model;
    run_stage(PipelineStage::Writers, async {
        for writer in writers {
            writer
                .write(model, &findings)
                .await
                .map_err(|e| PipelineError::writer(writer.name(), e))?;
            debug!(writer = writer.name(), "Writer completed");
        }
        Ok::<_, PipelineError>(())
    })
    .await?;
    stages_completed.push(PipelineStage::Writers);
    Ok(findings)
}

async fn discard_output(cleaning: &OutputCleaning) {
    match cleaning.storage.delete_dir(&cleaning.dir).await {
        Ok(()) => info!(dir = %cleaning.dir, "Removed partial output"),
        Err(e) => warn!(dir = %cleaning.dir, error = %e, "Failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FindingSubject, ImplementationErrorType, Link};
    use crate::reader::DefaultReader;
    use crate::storage::memory::MemoryStorageBackend;
    use crate::writer::MarkdownWriter;
    use async_trait::async_trait;

    const INPUT: &[(&str, &str)] = &[
        ("in/index.yaml", "title: Shop\n"),
        ("in/customers/index.yaml", "$id: /customers\ntitle: Customers\n"),
        (
            "in/customers/Customer.yaml",
            "$id: /customers/Customer.yaml\ntitle: Customer\ntype: object\nproperties:\n  name:\n    type: string\n",
        ),
    ];

    struct Linker;

    #[async_trait(?Send)]
    impl Plugin for Linker {
        fn name(&self) -> &str {
            "linker"
        }

        async fn update_model(&self, model: &mut Model) -> anyhow::Result<()> {
            model.application_mut().links.push(Link::new("Repo", "https://example.com"));
            Ok(())
        }

        async fn validate(&self, _model: &Model) -> anyhow::Result<Vec<Finding>> {
            Ok(vec![Finding::new(
                FindingSubject::Application,
                ImplementationErrorType::Wrong,
                "checked",
            )])
        }
    }

    struct Failing;

    #[async_trait(?Send)]
    impl Plugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate_output(&self, _model: &Model) -> anyhow::Result<()> {
            anyhow::bail!("generator crashed")
        }
    }

    fn options(storage: &MemoryStorageBackend) -> RunOptions {
        RunOptions::new(DefaultReader::new(storage.clone(), "in"))
            .with_writer(MarkdownWriter::new(storage.clone(), "out"))
    }

    #[tokio::test]
    async fn test_run_reports_stages_and_findings() {
        let storage = MemoryStorageBackend::with_files(INPUT.iter().copied());
        let report = run(options(&storage).with_plugin(Linker)).await.unwrap();

        assert_eq!(report.schemas, 1);
        assert_eq!(report.modules, 1);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(
            report.stages_completed,
            vec![PipelineStage::Read, PipelineStage::Plugins, PipelineStage::Writers]
        );
        let readme = storage.get("out/README.md").unwrap();
        assert!(readme.contains("- [Repo](https://example.com)"));
        assert!(readme.contains("- 1 validation error"));
    }

    #[tokio::test]
    async fn test_plugin_failure_stops_and_discards_output() {
        let storage = MemoryStorageBackend::with_files(INPUT.iter().copied());
        storage.write_file("out/stale.md", b"old").await.unwrap();

        let options = options(&storage)
            .with_plugin(Failing)
            .with_clean_output(OutputCleaning::new(storage.clone(), "out"));
        let err = run(options).await.unwrap_err();

        match &err {
            PipelineError::PluginFailure { plugin, .. } => assert_eq!(plugin, "failing"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(storage.paths().iter().all(|p| !p.starts_with("out/")));
    }

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let mut files: Vec<(&str, &str)> = INPUT.to_vec();
        files.push((
            "in/customers/Broken.yaml",
            "$id: /customers/Broken.yaml\ntype: object\nproperties:\n  a:\n    $ref: '#/does-not-exist'\n",
        ));
        let storage = MemoryStorageBackend::with_files(files);
        let err = run(options(&storage)).await.unwrap_err();

        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
        assert!(storage.paths().iter().all(|p| p.starts_with("in/")));
    }
}
