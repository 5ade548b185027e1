//! Render contexts
//!
//! Each page is rendered from a context holding the model entity, the
//! plugin findings about it and its class diagram.

use super::helpers;
use crate::models::{
    Application, DependencyGraph, Finding, FindingSubject, Model, Module, Schema, SchemaHandle,
};

/// Context of the application page
pub struct ApplicationContext<'a> {
    pub model: &'a Model,
    pub application: &'a Application,
    /// Input todos plus the findings counter
    pub todos: Vec<String>,
    pub findings: Vec<&'a Finding>,
    pub diagram: Option<String>,
}

/// Context of a module page
pub struct ModuleContext<'a> {
    pub model: &'a Model,
    pub module: &'a Module,
    pub schemas: Vec<(SchemaHandle, &'a Schema)>,
    pub todos: Vec<String>,
    pub findings: Vec<&'a Finding>,
    pub diagram: Option<String>,
}

/// Context of a schema page
pub struct SchemaContext<'a> {
    pub model: &'a Model,
    pub handle: SchemaHandle,
    pub schema: &'a Schema,
    pub module: Option<&'a Module>,
    pub todos: Vec<String>,
    pub findings: Vec<&'a Finding>,
    pub diagram: Option<String>,
}

fn todos_with_findings(todos: &[String], findings: usize) -> Vec<String> {
    let mut todos = todos.to_vec();
    todos.extend(helpers::error_todo(findings));
    todos
}

fn findings_about<'a>(findings: &'a [Finding], subject: &FindingSubject) -> Vec<&'a Finding> {
    findings.iter().filter(|f| f.subject == *subject).collect()
}

impl<'a> ApplicationContext<'a> {
    pub fn new(model: &'a Model, graph: &DependencyGraph, findings: &'a [Finding]) -> Self {
        let application = model.application();
        let findings = findings_about(findings, &FindingSubject::Application);
        Self {
            model,
            application,
            todos: todos_with_findings(&application.todos, findings.len()),
            findings,
            diagram: helpers::application_diagram(model, graph),
        }
    }
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        model: &'a Model,
        graph: &DependencyGraph,
        module: &'a Module,
        findings: &'a [Finding],
    ) -> Self {
        let findings = findings_about(findings, &FindingSubject::Module(module.id.clone()));
        Self {
            model,
            module,
            schemas: module
                .schemas
                .iter()
                .map(|&handle| (handle, model.schema(handle)))
                .collect(),
            todos: todos_with_findings(&module.todos, findings.len()),
            findings,
            diagram: helpers::module_diagram(model, graph, module),
        }
    }
}

impl<'a> SchemaContext<'a> {
    pub fn new(
        model: &'a Model,
        graph: &DependencyGraph,
        handle: SchemaHandle,
        findings: &'a [Finding],
    ) -> Self {
        let schema = model.schema(handle);
        let findings = findings_about(findings, &FindingSubject::Schema(handle));
        Self {
            model,
            handle,
            schema,
            module: model.module_for(handle),
            todos: todos_with_findings(&schema.todos, findings.len()),
            findings,
            diagram: helpers::schema_diagram(model, graph, handle),
        }
    }
}
