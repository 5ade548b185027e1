//! Domain Schema Docs - resolve domain schemas into a model and document it
//!
//! Provides:
//! - A reader turning application, module and schema documents into a
//!   resolved, validated [`Model`]
//! - Storage backends for the input and output trees
//! - Plugins that enrich the model and generate artifacts (OpenAPI)
//! - Writers that render the model (Markdown)
//! - A pipeline running reader, plugins and writers in order
//! - A `domain-schema-docs` binary (feature `cli`)

#[cfg(feature = "cli")]
pub mod cli;
pub mod models;
pub mod pipeline;
pub mod plugin;
pub mod reader;
pub mod storage;
pub mod validation;
pub mod writer;

// Re-export commonly used types
pub use storage::{StorageBackend, StorageError};
#[cfg(feature = "native-fs")]
pub use storage::filesystem::FileSystemStorageBackend;
pub use storage::memory::MemoryStorageBackend;

pub use models::{
    Application, Finding, FindingSubject, Model, Module, RefTarget, Schema, SchemaHandle,
    SchemaKind,
};
pub use reader::{
    CyclePolicy, DefaultReader, DiscriminatorMode, ReadError, Reader, ReaderConfig, SourceFile,
    build_model,
};
pub use validation::{ErrorKind, FormatRegistry, ValidationError, ValidationErrors};

pub use pipeline::{
    OutputCleaning, Pipeline, PipelineError, PipelineResult, RunConfig, RunOptions, RunReport, run,
};
pub use plugin::{OpenApiOptions, OpenApiPlugin, Plugin};
pub use writer::{DefaultTemplates, MarkdownWriter, Templates, Writer};
