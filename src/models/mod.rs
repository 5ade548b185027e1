//! Model types
//!
//! The `Model` is the single resolved graph handed to plugins and writers.
//! Schemas live in an arena addressed by `SchemaHandle`; references between
//! schemas are handles, so cycles in the input are plain graph edges.

pub mod common;
pub mod dependencies;
pub mod paths;
pub mod schema;

pub use common::{
    ImplementationError, ImplementationErrorType, Link, SchemaType, SourceLocation, Tag,
};
pub use dependencies::{Dependency, DependencyGraph, DependencyType};
pub use schema::{
    AdditionalProperties, ArrayItems, Constraints, Definition, DefinitionBody, DefinitionKind,
    Discriminator, EnumBody, Example, JsonType, ObjectBody, Primitive, Property, PropertyType,
    RawRef, RefRole, RefTarget, ResolvedRef, Schema, SchemaHandle, SchemaKind, VariantLink,
};

use serde::Serialize;
use std::collections::HashMap;

/// Error type for model mutations
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Duplicate schema id: {0}")]
    DuplicateId(String),
    #[error("Unknown module: {0}")]
    UnknownModule(String),
}

/// The application document (`index.yaml` at the input root)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Application {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub todos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ImplementationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip)]
    pub location: SourceLocation,
}

/// A module: one directory of schemas with its `index.yaml`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    #[serde(rename = "$id")]
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub todos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ImplementationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// Schemas of this module in discovery order
    pub schemas: Vec<SchemaHandle>,
    #[serde(skip)]
    pub location: SourceLocation,
}

impl Module {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            todos: Vec::new(),
            links: Vec::new(),
            errors: Vec::new(),
            tags: Vec::new(),
            schemas: Vec::new(),
            location: SourceLocation::default(),
        }
    }

    /// Last segment of the module id
    pub fn name(&self) -> &str {
        paths::module_name(&self.id)
    }
}

/// What a finding is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSubject {
    Application,
    Module(String),
    Schema(SchemaHandle),
}

/// A verification result reported by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ImplementationErrorType,
    pub subject: FindingSubject,
}

impl Finding {
    pub fn new(
        subject: FindingSubject,
        kind: ImplementationErrorType,
        text: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            kind,
            subject,
        }
    }
}

/// The resolved domain model
#[derive(Debug, Clone, Default, Serialize)]
pub struct Model {
    application: Application,
    modules: Vec<Module>,
    schemas: Vec<Schema>,
    #[serde(skip)]
    index: HashMap<String, SchemaHandle>,
}

impl Model {
    pub fn new(application: Application) -> Self {
        Self {
            application,
            ..Self::default()
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut Application {
        &mut self.application
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn module_mut(&mut self, id: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id == id)
    }

    /// Module owning a schema
    pub fn module_for(&self, handle: SchemaHandle) -> Option<&Module> {
        self.module(self.schema(handle).module_id())
    }

    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Handles of all schemas in arena order
    pub fn handles(&self) -> impl Iterator<Item = SchemaHandle> + '_ {
        (0..self.schemas.len()).map(SchemaHandle::new)
    }

    /// Schema behind a handle; handles are only created by this model
    pub fn schema(&self, handle: SchemaHandle) -> &Schema {
        &self.schemas[handle.index()]
    }

    pub fn schema_mut(&mut self, handle: SchemaHandle) -> &mut Schema {
        &mut self.schemas[handle.index()]
    }

    pub fn schema_by_id(&self, id: &str) -> Option<SchemaHandle> {
        self.index.get(id).copied()
    }

    /// Definition a reference target points at (the root for schema targets)
    pub fn definition_of(&self, target: &RefTarget) -> Option<&Definition> {
        self.schema(target.schema())
            .definition(target.definition_name())
    }

    /// Add a module; its id must be unique
    pub fn add_module(&mut self, module: Module) -> Result<(), ModelError> {
        if self.module(&module.id).is_some() {
            return Err(ModelError::DuplicateId(module.id));
        }
        self.modules.push(module);
        Ok(())
    }

    /// Add a schema to the arena and to its module
    pub fn add_schema(&mut self, schema: Schema) -> Result<SchemaHandle, ModelError> {
        if self.index.contains_key(&schema.id) {
            return Err(ModelError::DuplicateId(schema.id));
        }
        let module_id = schema.module_id().to_string();
        let handle = SchemaHandle::new(self.schemas.len());
        let module = self
            .modules
            .iter_mut()
            .find(|m| m.id == module_id)
            .ok_or(ModelError::UnknownModule(module_id))?;
        module.schemas.push(handle);
        self.index.insert(schema.id.clone(), handle);
        self.schemas.push(schema);
        Ok(handle)
    }

    /// Build a model from schemas that were resolved against this exact order
    pub(crate) fn from_parts(
        application: Application,
        modules: Vec<Module>,
        schemas: Vec<Schema>,
    ) -> Self {
        let index = schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), SchemaHandle::new(i)))
            .collect();
        Self {
            application,
            modules,
            schemas,
            index,
        }
    }
}
