//! Schema reader
//!
//! Turns an input tree of application, module and schema documents into a
//! resolved [`Model`]:
//! - `source`: located YAML/JSON document trees
//! - `parser`: documents to `Schema<RawRef>`
//! - `resolver`: `$ref` resolution and cycle detection
//! - `discriminator`: polymorphic base and variant linking
//! - `assembler`: the final model
//!
//! Errors of all phases are collected and reported together, sorted by
//! location. No partial model is ever returned.

pub mod assembler;
pub mod config;
pub mod discriminator;
pub mod parser;
pub mod resolver;
pub mod source;

pub use config::{CyclePolicy, DiscriminatorMode, ReaderConfig};
pub use resolver::ReferenceResolver;
pub use source::SourceFile;

use crate::models::{Application, Model, Module, RawRef, Schema};
use crate::storage::{self, StorageBackend, StorageError};
use crate::validation::{ErrorKind, ValidationError, ValidationErrors, Validator};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for reading a model
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Invalid reader configuration: {0}")]
    Config(String),
}

/// Produces the model a pipeline run works on
#[async_trait(?Send)]
pub trait Reader {
    async fn read(&self) -> Result<Model, ReadError>;
}

/// What an input file describes, decided by its path
#[derive(Debug, Clone, PartialEq, Eq)]
enum DocumentKind {
    Application,
    Module(String),
    Schema(String),
}

fn classify(source: &SourceFile) -> Result<DocumentKind, ValidationError> {
    let path = source.path.as_str();
    let location = crate::models::SourceLocation::file(path);
    let extension = path.rsplit_once('.').map(|(_, e)| e);
    if !matches!(extension, Some("yaml" | "yml" | "json")) {
        return Err(ValidationError::malformed(
            format!("Unsupported file '{}', expected .yaml, .yml or .json", path),
            location,
        ));
    }

    let (dir, file) = path.rsplit_once('/').unwrap_or(("", path));
    let is_index = matches!(file, "index.yaml" | "index.yml");
    match (dir.is_empty(), is_index) {
        (true, true) => Ok(DocumentKind::Application),
        (false, true) => Ok(DocumentKind::Module(format!("/{}", dir))),
        (true, false) => Err(ValidationError::malformed(
            format!("Schema '{}' must be placed in a module directory", path),
            location,
        )),
        (false, false) => Ok(DocumentKind::Schema(format!("/{}", path))),
    }
}

enum Document {
    Application(Application),
    Module(Module),
    Schema(Box<Schema<RawRef>>),
}

fn parse_source(source: &SourceFile, config: &ReaderConfig) -> Result<Document, ValidationError> {
    let kind = classify(source)?;
    let node = source::parse_document(source)?;
    Ok(match kind {
        DocumentKind::Application => Document::Application(parser::parse_application(&node)?),
        DocumentKind::Module(id) => Document::Module(parser::parse_module(&node, &id)?),
        DocumentKind::Schema(id) => {
            Document::Schema(Box::new(parser::parse_schema(&node, &id, config)?))
        }
    })
}

/// Run parsing, resolution, reconciliation, validation and assembly on
/// in-memory sources
///
/// The result does not depend on the order of `sources`.
pub fn build_model(mut sources: Vec<SourceFile>, config: &ReaderConfig) -> Result<Model, ReadError> {
    config.validate().map_err(ReadError::Config)?;

    let mut errors = ValidationErrors::new();
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    for pair in sources.windows(2) {
        if pair[0].path == pair[1].path {
            errors.push(ValidationError::new(
                ErrorKind::DuplicateId,
                format!("Duplicate source file '{}'", pair[1].path),
                crate::models::SourceLocation::file(&pair[1].path),
            ));
        }
    }
    sources.dedup_by(|a, b| a.path == b.path);

    let validator = Validator::new(&config.formats);
    let mut application = None;
    let mut modules = Vec::new();
    let mut schemas = Vec::new();
    let mut parse_failed = false;
    for source in &sources {
        debug!(path = %source.path, "Parsing document");
        match parse_source(source, config) {
            Ok(Document::Application(parsed)) => application = Some(parsed),
            Ok(Document::Module(module)) => modules.push(module),
            Ok(Document::Schema(schema)) => {
                errors.extend(validator.check_structure(&*schema));
                schemas.push(*schema);
            }
            Err(e) => {
                parse_failed = true;
                errors.push(e);
            }
        }
    }
    if parse_failed {
        return Err(errors.sorted().into());
    }

    let application = application.unwrap_or_else(|| {
        warn!("No application document (index.yaml) in the input root, using an empty application");
        Application::default()
    });
    info!(modules = modules.len(), schemas = schemas.len(), "Parsed input");
    errors.extend(assembler::check_modules(&modules, &schemas));

    let mut resolved = match ReferenceResolver::resolve_all(schemas) {
        Ok(resolved) => resolved,
        Err(unresolved) => {
            errors.extend(unresolved);
            return Err(errors.sorted().into());
        }
    };
    errors.extend(resolver::check_cycles(&resolved, config.cycles));
    errors.extend(discriminator::reconcile(&mut resolved, config.discriminator));
    errors.extend(validator.validate(&resolved));
    errors.sorted().into_result()?;

    Ok(assembler::assemble(application, modules, resolved)?)
}

/// Reader over an input root of a storage backend
pub struct DefaultReader<B: StorageBackend> {
    storage: B,
    root: String,
    config: ReaderConfig,
}

impl<B: StorageBackend> DefaultReader<B> {
    /// Read the tree below `root` (`""` for the backend root)
    pub fn new(storage: B, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
            config: ReaderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Every file below the root; hidden entries are skipped
    pub async fn discover(&self) -> Result<Vec<SourceFile>, StorageError> {
        if !self.storage.dir_exists(&self.root).await? {
            return Err(StorageError::DirectoryNotFound(self.root.clone()));
        }

        let mut sources = Vec::new();
        let mut pending = vec![String::new()];
        while let Some(relative) = pending.pop() {
            let dir = storage::join(&self.root, &relative);
            for name in self.storage.list_files(&dir).await? {
                if name.starts_with('.') {
                    continue;
                }
                let path = storage::join(&relative, &name);
                let content = self
                    .storage
                    .read_to_string(&storage::join(&self.root, &path))
                    .await?;
                sources.push(SourceFile::new(path, content));
            }
            for name in self.storage.list_dirs(&dir).await? {
                if !name.starts_with('.') {
                    pending.push(storage::join(&relative, &name));
                }
            }
        }
        Ok(sources)
    }
}

#[async_trait(?Send)]
impl<B: StorageBackend> Reader for DefaultReader<B> {
    async fn read(&self) -> Result<Model, ReadError> {
        let sources = self.discover().await?;
        info!(root = %self.root, files = sources.len(), "Discovered input files");
        build_model(sources, &self.config)
    }
}
